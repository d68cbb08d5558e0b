//! Input events delivered by the host's event pump.
//!
//! Key-to-character mapping happens in the host; by the time an event
//! reaches the state machine a printable key already carries its character.

use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// A key symbol as seen by the presentation layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Key {
    /// Enter / return.
    Return,
    /// Space bar.
    Space,
    /// Escape.
    Escape,
    /// Cursor up.
    Up,
    /// Cursor down.
    Down,
    /// Cursor left.
    Left,
    /// Cursor right.
    Right,
    /// Backspace.
    Backspace,
    /// Shift, control, alt, lock keys and similar non-printing modifiers.
    Modifier,
    /// A printable key, already mapped to its character.
    Char(char),
    /// Anything else.
    Other,
}

impl Key {
    /// True for the keys that confirm a dialog choice.
    pub const fn is_confirm(self) -> bool {
        matches!(self, Self::Return | Self::Space)
    }
}

/// Kind of a host event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    /// A key went down.
    KeyDown,
    /// A key came up.
    KeyUp,
    /// The window or tab asked to close.
    Quit,
    /// The surface needs repainting.
    Expose,
}

/// One event from the host's event pump.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InputEvent {
    /// What happened.
    pub kind: EventKind,
    /// Key symbol; [`Key::Other`] for non-key events.
    pub key: Key,
}

impl InputEvent {
    /// A key-down event for `key`.
    pub const fn key_down(key: Key) -> Self {
        Self {
            kind: EventKind::KeyDown,
            key,
        }
    }

    /// A key-up event for `key`.
    pub const fn key_up(key: Key) -> Self {
        Self {
            kind: EventKind::KeyUp,
            key,
        }
    }

    /// A quit request.
    pub const fn quit() -> Self {
        Self {
            kind: EventKind::Quit,
            key: Key::Other,
        }
    }

    /// An expose (repaint) notification.
    pub const fn expose() -> Self {
        Self {
            kind: EventKind::Expose,
            key: Key::Other,
        }
    }

    /// The key if this is a key-down event.
    pub const fn pressed(&self) -> Option<Key> {
        match self.kind {
            EventKind::KeyDown => Some(self.key),
            _ => None,
        }
    }
}

/// Events drained in one poll. Most frames carry zero or one event.
pub type EventBatch = SmallVec<[InputEvent; 8]>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_key_down_reports_pressed() {
        assert_eq!(InputEvent::key_down(Key::Up).pressed(), Some(Key::Up));
        assert_eq!(InputEvent::key_up(Key::Up).pressed(), None);
        assert_eq!(InputEvent::quit().pressed(), None);
    }

    #[test]
    fn confirm_keys() {
        assert!(Key::Return.is_confirm());
        assert!(Key::Space.is_confirm());
        assert!(!Key::Escape.is_confirm());
    }
}
