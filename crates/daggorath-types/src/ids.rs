//! Small integer identifiers for task control blocks and audio channels.
//!
//! The original hardware addressed both by a byte-sized index. The newtypes
//! here keep that representation but prevent a task slot from being passed
//! where an audio channel is expected.

use serde::{Deserialize, Serialize};

/// Generates a newtype wrapper around a small unsigned index with standard derives.
macro_rules! define_index {
    (
        $(#[$meta:meta])*
        $name:ident($repr:ty)
    ) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        pub struct $name(pub $repr);

        impl $name {
            /// Return the raw index value.
            pub const fn get(self) -> $repr {
                self.0
            }

            /// Return the index as a `usize` for table lookups.
            pub const fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl core::fmt::Display for $name {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<$repr> for $name {
            fn from(raw: $repr) -> Self {
                Self(raw)
            }
        }
    };
}

define_index! {
    /// Identity of one task control block (its slot in the table).
    TaskId(u8)
}

define_index! {
    /// A mixer channel addressed by the audio collaborator.
    ChannelId(u8)
}

impl TaskId {
    /// Drives the game clock: heartbeat counters and timed effects.
    pub const CLOCK: Self = Self(0);
    /// Reads the keyboard buffer and executes player commands.
    pub const PLAYER: Self = Self(1);
    /// Redraws the dungeon view when something changed.
    pub const REFRESH_DISPLAY: Self = Self(2);
    /// Slows the heart rate back toward rest.
    pub const HEART_SLOW: Self = Self(3);
    /// Burns down the lit torch.
    pub const TORCH_BURN: Self = Self(4);
    /// Regenerates creatures on the current level.
    pub const CREATURE_REGEN: Self = Self(5);
    /// First slot of the creature movement blocks.
    pub const CREATURE_MOVE_BASE: Self = Self(6);

    /// Number of fixed (non-creature) blocks at the front of the table.
    pub const FIXED_COUNT: usize = 6;

    /// Return the creature movement slot for creature `n`, if it fits in a `u8`.
    pub const fn creature_move(n: u8) -> Option<Self> {
        match Self::CREATURE_MOVE_BASE.0.checked_add(n) {
            Some(raw) => Some(Self(raw)),
            None => None,
        }
    }

    /// True when this id addresses a creature movement slot.
    pub const fn is_creature_move(self) -> bool {
        self.0 >= Self::CREATURE_MOVE_BASE.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creature_slots_follow_fixed_blocks() {
        assert_eq!(TaskId::creature_move(0), Some(TaskId::CREATURE_MOVE_BASE));
        assert_eq!(TaskId::creature_move(3), Some(TaskId(9)));
        assert_eq!(TaskId::creature_move(250), None);
        assert!(TaskId(6).is_creature_move());
        assert!(!TaskId::CREATURE_REGEN.is_creature_move());
        assert_eq!(TaskId::FIXED_COUNT, TaskId::CREATURE_MOVE_BASE.index());
    }

    #[test]
    fn channel_display_is_raw_index() {
        assert_eq!(ChannelId(3).to_string(), "3");
        assert_eq!(ChannelId::from(7).get(), 7);
    }
}
