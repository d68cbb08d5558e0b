//! Shared type definitions for the Daggorath scheduler and presentation core.
//!
//! This crate is the vocabulary shared by the scheduler, the presentation
//! state machine and the host. It holds no behavior beyond small lookups.
//!
//! # Modules
//!
//! - [`ids`] -- Task control block and audio channel indices
//! - [`enums`] -- Modes, fade variants and phases, directions, view/audio vocabulary
//! - [`input`] -- Host input events
//! - [`menu`] -- Option menu grid and timing list
//! - [`request`] -- Transition requests raised by gameplay code
//! - [`settings`] -- User-tunable settings and their ranges

pub mod enums;
pub mod ids;
pub mod input;
pub mod menu;
pub mod request;
pub mod settings;

// Re-export all public types at crate root for convenience.
pub use enums::{
    Clip, FadePhase, FadeVariant, GameMode, GraphicsMode, LoopCount, Message, MoveDirection,
    PostFadeAction, Region, TurnDirection,
};
pub use ids::{ChannelId, TaskId};
pub use input::{EventBatch, EventKind, InputEvent, Key};
pub use menu::{MENU_COLUMNS, MenuColumn, MenuCursor, MenuItem, TIMING_LIST, TimingSetting, column_len};
pub use request::Request;
pub use settings::{
    CHEAT_LABELS, Cheats, GAMEPLAY_MOD_LABELS, GameplayMods, Settings, VOLUME_MAX, VOLUME_RANGE,
    ValueRange, toggle_label,
};
