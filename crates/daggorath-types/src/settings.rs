//! User-tunable settings edited through the option menu.
//!
//! Defaults are what a fresh options file holds. Ranges bound the
//! scrollbar dialogs that edit the numeric values.

use serde::{Deserialize, Serialize};

use crate::enums::GraphicsMode;

/// Inclusive range of a value edited by a scrollbar.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueRange {
    /// Smallest selectable value.
    pub min: i32,
    /// Largest selectable value.
    pub max: i32,
}

impl ValueRange {
    /// Build a range.
    pub const fn new(min: i32, max: i32) -> Self {
        Self { min, max }
    }

    /// Distance between the bounds; zero or negative means the range is unusable.
    pub const fn span(self) -> i32 {
        self.max.saturating_sub(self.min)
    }
}

/// Maximum mixer volume.
pub const VOLUME_MAX: u8 = 128;

/// Scrollbar range of the master volume.
pub const VOLUME_RANGE: ValueRange = ValueRange::new(0, 128);
/// Scrollbar range of the creature speed multiplier.
pub const CREATURE_SPEED_RANGE: ValueRange = ValueRange::new(50, 300);
/// Scrollbar range of the per-frame turn delay in milliseconds.
pub const TURN_DELAY_RANGE: ValueRange = ValueRange::new(0, 100);
/// Scrollbar range of the step delay in milliseconds.
pub const MOVE_DELAY_RANGE: ValueRange = ValueRange::new(0, 1000);
/// Scrollbar range of the creature regeneration interval in minutes.
pub const CREATURE_REGEN_RANGE: ValueRange = ValueRange::new(1, 20);

/// Every user-tunable setting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Rendering style.
    #[serde(default)]
    pub graphics: GraphicsMode,

    /// Stereo (true) or mono (false) sound.
    #[serde(default = "default_true")]
    pub stereo: bool,

    /// Master volume, `0..=128`.
    #[serde(default = "default_volume")]
    pub volume: u8,

    /// Creature speed multiplier (percent of original speed).
    #[serde(default = "default_creature_speed")]
    pub creature_speed: i32,

    /// Duration of one turn-animation frame in milliseconds.
    #[serde(default = "default_turn_delay_ms")]
    pub turn_delay_ms: u32,

    /// Duration of a full step animation in milliseconds.
    #[serde(default = "default_move_delay_ms")]
    pub move_delay_ms: u32,

    /// Minutes between creature regenerations.
    #[serde(default = "default_creature_regen_minutes")]
    pub creature_regen_minutes: u32,

    /// Gameplay modifications.
    #[serde(default)]
    pub mods: GameplayMods,

    /// Cheats.
    #[serde(default)]
    pub cheats: Cheats,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            graphics: GraphicsMode::default(),
            stereo: default_true(),
            volume: default_volume(),
            creature_speed: default_creature_speed(),
            turn_delay_ms: default_turn_delay_ms(),
            move_delay_ms: default_move_delay_ms(),
            creature_regen_minutes: default_creature_regen_minutes(),
            mods: GameplayMods::default(),
            cheats: Cheats::default(),
        }
    }
}

/// Gameplay modifications, each toggled from a list dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct GameplayMods {
    /// Shields work as documented.
    pub shield_fix: bool,
    /// Vision scroll shows creatures.
    pub vision_scroll: bool,
    /// Doors marked on scroll maps.
    pub mark_doors_on_scroll_maps: bool,
    /// Creatures ignore objects on the floor.
    pub creatures_ignore_objects: bool,
    /// Creatures regenerate immediately.
    pub creatures_insta_regen: bool,
    /// Random maze generation.
    pub random_maze: bool,
    /// Arrow keys and mouse controls.
    pub modern_controls: bool,
}

/// Labels of the gameplay modifications, in list order.
pub const GAMEPLAY_MOD_LABELS: [&str; 7] = [
    "SHIELD FIX",
    "VISION SCROLL",
    "MARK DOORS ON MAPS",
    "CREATURES IGNORE OBJS",
    "CREATURES INSTA-REGEN",
    "RANDOM MAZES",
    "MODERN CONTROLS",
];

impl GameplayMods {
    /// Current state of each modification, in list order.
    pub const fn flags(&self) -> [bool; 7] {
        [
            self.shield_fix,
            self.vision_scroll,
            self.mark_doors_on_scroll_maps,
            self.creatures_ignore_objects,
            self.creatures_insta_regen,
            self.random_maze,
            self.modern_controls,
        ]
    }

    /// Flip the modification at list row `index`. Returns false for rows
    /// outside the list (such as BACK).
    pub const fn toggle(&mut self, index: usize) -> bool {
        let flag = match index {
            0 => &mut self.shield_fix,
            1 => &mut self.vision_scroll,
            2 => &mut self.mark_doors_on_scroll_maps,
            3 => &mut self.creatures_ignore_objects,
            4 => &mut self.creatures_insta_regen,
            5 => &mut self.random_maze,
            6 => &mut self.modern_controls,
            _ => return false,
        };
        *flag = !*flag;
        true
    }
}

/// Cheats, each toggled from a list dialog.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
#[allow(clippy::struct_excessive_bools)]
pub struct Cheats {
    /// Start with mithril items.
    pub mithril_items: bool,
    /// Damage is ignored.
    pub invulnerable: bool,
    /// Creature regeneration scales with level.
    pub creature_scaling: bool,
    /// Revealing items is free.
    pub easy_reveal: bool,
    /// Rings never run out.
    pub ring_always_works: bool,
    /// Torches never burn down.
    pub torch_always_lit: bool,
}

/// Labels of the cheats, in list order.
pub const CHEAT_LABELS: [&str; 6] = [
    "MITHRIL ITEMS",
    "INVULNERABLE",
    "CREATURE SCALING",
    "EASY REVEAL",
    "RING ALWAYS WORKS",
    "TORCH ALWAYS LIT",
];

impl Cheats {
    /// Current state of each cheat, in list order.
    pub const fn flags(&self) -> [bool; 6] {
        [
            self.mithril_items,
            self.invulnerable,
            self.creature_scaling,
            self.easy_reveal,
            self.ring_always_works,
            self.torch_always_lit,
        ]
    }

    /// Flip the cheat at list row `index`. Returns false for rows outside
    /// the list.
    pub const fn toggle(&mut self, index: usize) -> bool {
        let flag = match index {
            0 => &mut self.mithril_items,
            1 => &mut self.invulnerable,
            2 => &mut self.creature_scaling,
            3 => &mut self.easy_reveal,
            4 => &mut self.ring_always_works,
            5 => &mut self.torch_always_lit,
            _ => return false,
        };
        *flag = !*flag;
        true
    }
}

/// Format a toggle list row the way the menu renders it: `[ON]  LABEL`.
pub fn toggle_label(on: bool, label: &str) -> String {
    let prefix = if on { "[ON]  " } else { "[OFF] " };
    format!("{prefix}{label}")
}

// ---------------------------------------------------------------------------
// Default value functions (used by serde)
// ---------------------------------------------------------------------------

const fn default_true() -> bool {
    true
}

const fn default_volume() -> u8 {
    VOLUME_MAX
}

const fn default_creature_speed() -> i32 {
    200
}

const fn default_turn_delay_ms() -> u32 {
    37
}

const fn default_move_delay_ms() -> u32 {
    500
}

const fn default_creature_regen_minutes() -> u32 {
    5
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_fresh_options_file() {
        let s = Settings::default();
        assert_eq!(s.turn_delay_ms, 37);
        assert_eq!(s.move_delay_ms, 500);
        assert_eq!(s.creature_speed, 200);
        assert_eq!(s.creature_regen_minutes, 5);
        assert_eq!(s.volume, 128);
        assert!(s.stereo);
        assert_eq!(s.graphics, GraphicsMode::Normal);
    }

    #[test]
    fn partial_yaml_fills_defaults() {
        let s: Settings = serde_yml::from_str("volume: 64\nmods:\n  random_maze: true\n").unwrap();
        assert_eq!(s.volume, 64);
        assert!(s.mods.random_maze);
        assert!(!s.mods.shield_fix);
        assert_eq!(s.turn_delay_ms, 37);
    }

    #[test]
    fn toggles_flip_and_reject_back_row() {
        let mut mods = GameplayMods::default();
        assert!(mods.toggle(5));
        assert!(mods.random_maze);
        assert!(mods.toggle(5));
        assert!(!mods.random_maze);
        assert!(!mods.toggle(7));

        let mut cheats = Cheats::default();
        assert!(cheats.toggle(1));
        assert_eq!(cheats.flags(), [false, true, false, false, false, false]);
        assert!(!cheats.toggle(6));
    }

    #[test]
    fn toggle_labels() {
        assert_eq!(toggle_label(true, "SHIELD FIX"), "[ON]  SHIELD FIX");
        assert_eq!(toggle_label(false, "SHIELD FIX"), "[OFF] SHIELD FIX");
    }

    #[test]
    fn ranges_have_positive_span() {
        for range in [
            VOLUME_RANGE,
            CREATURE_SPEED_RANGE,
            TURN_DELAY_RANGE,
            MOVE_DELAY_RANGE,
            CREATURE_REGEN_RANGE,
        ] {
            assert!(range.span() > 0);
        }
    }
}
