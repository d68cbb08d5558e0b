//! Non-blocking presentation state machine for the Daggorath game loop.
//!
//! Everything the player sees between bursts of gameplay lives here: the
//! title, intermission, death and victory fades, the turn and step
//! animations, fainting and recovering, and the option menu with its
//! dialogs. Each is a mode of [`Presentation`] advanced once per rendered
//! frame; none of them blocks the host.
//!
//! # Modules
//!
//! - [`collaborators`] -- Traits for the view, audio, input, gameplay and saves
//! - [`pump`] -- Input draining shared by every mode
//! - [`fade`] -- The four fade sequences
//! - [`animation`] -- Turn, step, faint and recover animations
//! - [`menu`] -- Option menu and dialogs
//! - [`machine`] -- [`Presentation`], the mode state machine
//! - [`runner`] -- One frame of presentation plus gameplay
//!
//! [`Presentation`]: machine::Presentation

pub mod animation;
pub mod collaborators;
pub mod fade;
pub mod machine;
pub mod menu;
pub mod pump;
pub mod runner;

pub use collaborators::{
    Audio, AudioError, Frame, GameContext, Gameplay, InputSource, PersistError, SaveStore, View,
};
pub use machine::{Presentation, SessionEvent, SessionFlags};
pub use runner::{FrameSummary, run_frame};
