//! Layout of the option menu: a small fixed grid of columns and entries.

use serde::{Deserialize, Serialize};

use crate::settings::{
    CREATURE_REGEN_RANGE, CREATURE_SPEED_RANGE, MOVE_DELAY_RANGE, TURN_DELAY_RANGE, ValueRange,
};

/// One selectable entry of the option menu.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MenuItem {
    /// End the current game and start a new one.
    NewGame,
    /// Close the menu.
    Return,
    /// Pick a saved game to load.
    LoadGame,
    /// Name and write a saved game.
    SaveGame,
    /// Pick a saved game to delete.
    DeleteSave,
    /// Pick the rendering style.
    Graphics,
    /// Pick stereo or mono.
    SoundMode,
    /// Adjust the master volume.
    Volume,
    /// Pick a timing value to adjust.
    GameTiming,
    /// Toggle gameplay modifications.
    GameplayMods,
    /// Toggle cheats.
    Cheats,
    /// Persist the current settings.
    SaveOptions,
    /// Restore default settings.
    Defaults,
    /// Show build information.
    BuildInfo,
}

/// A column of the menu grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MenuColumn {
    /// Column heading.
    pub title: &'static str,
    /// Entries from top to bottom.
    pub items: &'static [MenuItem],
}

/// The menu grid, left to right.
pub const MENU_COLUMNS: [MenuColumn; 2] = [
    MenuColumn {
        title: "GAME",
        items: &[
            MenuItem::NewGame,
            MenuItem::Return,
            MenuItem::LoadGame,
            MenuItem::SaveGame,
            MenuItem::DeleteSave,
        ],
    },
    MenuColumn {
        title: "CONFIG",
        items: &[
            MenuItem::Graphics,
            MenuItem::SoundMode,
            MenuItem::Volume,
            MenuItem::GameTiming,
            MenuItem::GameplayMods,
            MenuItem::Cheats,
            MenuItem::SaveOptions,
            MenuItem::Defaults,
            MenuItem::BuildInfo,
        ],
    },
];

impl MenuItem {
    /// The entry at `column`, `row`, if the grid has one there.
    pub fn at(column: usize, row: usize) -> Option<Self> {
        MENU_COLUMNS
            .get(column)
            .and_then(|c| c.items.get(row))
            .copied()
    }

    /// Text shown for the entry.
    pub const fn label(self) -> &'static str {
        match self {
            Self::NewGame => "NEW GAME",
            Self::Return => "RETURN",
            Self::LoadGame => "LOAD GAME",
            Self::SaveGame => "SAVE GAME",
            Self::DeleteSave => "DELETE SAVE",
            Self::Graphics => "GRAPHICS",
            Self::SoundMode => "SOUND MODE",
            Self::Volume => "VOLUME",
            Self::GameTiming => "GAME TIMING",
            Self::GameplayMods => "GAMEPLAY MODS",
            Self::Cheats => "CHEATS",
            Self::SaveOptions => "SAVE OPTIONS",
            Self::Defaults => "DEFAULTS",
            Self::BuildInfo => "BUILD INFO",
        }
    }
}

/// Number of entries in `column`; zero for a column that does not exist.
pub fn column_len(column: usize) -> usize {
    MENU_COLUMNS.get(column).map_or(0, |c| c.items.len())
}

/// Selection position in the menu grid.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MenuCursor {
    /// Selected column.
    pub column: usize,
    /// Selected row within the column.
    pub row: usize,
}

impl MenuCursor {
    /// The entry under the cursor.
    pub fn item(self) -> Option<MenuItem> {
        MenuItem::at(self.column, self.row)
    }
}

/// A timing value reachable from the game timing list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimingSetting {
    /// Creature speed multiplier.
    CreatureSpeed,
    /// Turn animation frame delay.
    TurnDelay,
    /// Step animation delay.
    MoveDelay,
    /// Creature regeneration interval.
    CreatureRegen,
}

/// Rows of the game timing list, including the trailing BACK row.
pub const TIMING_LIST: [&str; 5] = [
    "CREATURE SPEED",
    "TURN DELAY",
    "MOVE DELAY",
    "CREATURE REGEN",
    "BACK",
];

impl TimingSetting {
    /// The setting selected by a row of the timing list; `None` for BACK.
    pub const fn from_choice(choice: usize) -> Option<Self> {
        match choice {
            0 => Some(Self::CreatureSpeed),
            1 => Some(Self::TurnDelay),
            2 => Some(Self::MoveDelay),
            3 => Some(Self::CreatureRegen),
            _ => None,
        }
    }

    /// Scrollbar title.
    pub const fn label(self) -> &'static str {
        match self {
            Self::CreatureSpeed => "CREATURE SPEED",
            Self::TurnDelay => "TURN DELAY",
            Self::MoveDelay => "MOVE DELAY",
            Self::CreatureRegen => "CREATURE REGEN",
        }
    }

    /// Scrollbar range.
    pub const fn range(self) -> ValueRange {
        match self {
            Self::CreatureSpeed => CREATURE_SPEED_RANGE,
            Self::TurnDelay => TURN_DELAY_RANGE,
            Self::MoveDelay => MOVE_DELAY_RANGE,
            Self::CreatureRegen => CREATURE_REGEN_RANGE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grid_lookup() {
        assert_eq!(MenuItem::at(0, 0), Some(MenuItem::NewGame));
        assert_eq!(MenuItem::at(1, 2), Some(MenuItem::Volume));
        assert_eq!(MenuItem::at(0, 5), None);
        assert_eq!(MenuItem::at(2, 0), None);
        assert_eq!(column_len(0), 5);
        assert_eq!(column_len(1), 9);
        assert_eq!(column_len(9), 0);
    }

    #[test]
    fn timing_rows_end_with_back() {
        assert_eq!(TimingSetting::from_choice(1), Some(TimingSetting::TurnDelay));
        assert_eq!(TimingSetting::from_choice(4), None);
        assert_eq!(TIMING_LIST.len(), 5);
    }
}
