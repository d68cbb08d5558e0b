//! Narrow interfaces to the systems the presentation drives but does not own.
//!
//! Rendering, audio playback, input mapping, gameplay rules and persistence
//! all live outside this crate. The state machine reaches them only through
//! the traits here, bundled per frame into a [`GameContext`].

use daggorath_core::channel::ChannelSync;
use daggorath_core::scheduler::{Scheduler, TaskDispatcher};
use daggorath_types::{
    ChannelId, Clip, EventBatch, FadeVariant, LoopCount, MenuCursor, Message, MoveDirection,
    PostFadeAction, Region, Request, Settings, TurnDirection,
};
use tracing::warn;

/// Audio faults. The state machine logs these and carries on without sound.
#[derive(Debug, thiserror::Error)]
pub enum AudioError {
    /// The mixer has no such channel, or it could not be opened.
    #[error("audio channel {channel} unavailable")]
    ChannelUnavailable {
        /// The channel that was addressed.
        channel: ChannelId,
    },

    /// The clip was never loaded.
    #[error("audio clip {clip:?} not loaded")]
    ClipMissing {
        /// The missing clip.
        clip: Clip,
    },
}

/// Persistence faults reported by a [`SaveStore`].
#[derive(Debug, thiserror::Error)]
pub enum PersistError {
    /// No saved game has the given name.
    #[error("no saved game named {name:?}")]
    NotFound {
        /// Requested name.
        name: String,
    },

    /// The backing storage failed.
    #[error("save storage failed: {message}")]
    Storage {
        /// Description of the failure.
        message: String,
    },
}

/// What the view should draw this frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Frame<'a> {
    /// The wizard image of a fade sequence.
    Wizard {
        /// Which sequence is running (selects the wizard image).
        variant: FadeVariant,
        /// Fade counter; 0 is fully visible.
        fade: u8,
        /// Whether the primary text area (the message) is shown.
        show_message: bool,
    },
    /// Title screen with whatever messages were last shown.
    Title,
    /// The level map shown before autoplay starts.
    Map,
    /// The normal first-person view.
    Dungeon,
    /// One frame of the turn sweep: the view frame plus a vertical line.
    TurnSweep {
        /// Horizontal position of the sweeping line.
        x: i32,
    },
    /// The option menu grid.
    Menu {
        /// Highlighted entry.
        cursor: MenuCursor,
    },
    /// A list dialog.
    List {
        /// Dialog title.
        title: &'a str,
        /// Rows, top to bottom.
        items: &'a [String],
        /// Highlighted row.
        selected: usize,
    },
    /// A scrollbar dialog.
    Scrollbar {
        /// Dialog title.
        title: &'a str,
        /// Thumb position, `0..=31`.
        position: u8,
    },
    /// A text entry dialog.
    TextInput {
        /// Dialog title.
        title: &'a str,
        /// Text typed so far.
        text: &'a str,
    },
}

/// Renderer collaborator.
pub trait View {
    /// Render `frame` into the back buffer.
    fn draw_frame(&mut self, frame: &Frame<'_>);

    /// Blank a text region.
    fn clear_region(&mut self, region: Region);

    /// Write a canned message into its text region.
    fn show_message(&mut self, message: Message);

    /// Set the screen light level used by subsequent frames.
    fn set_light_level(&mut self, level: u8);

    /// Current screen light level.
    fn light_level(&self) -> u8;

    /// Show the back buffer.
    fn present_swap(&mut self);
}

/// Audio collaborator.
pub trait Audio {
    /// Start `clip` on `channel`, replacing whatever played there.
    fn play_on_channel(
        &mut self,
        channel: ChannelId,
        clip: Clip,
        loops: LoopCount,
    ) -> Result<(), AudioError>;

    /// Set one channel's volume, `0..=128`.
    fn set_channel_volume(&mut self, channel: ChannelId, level: u8) -> Result<(), AudioError>;

    /// Set every channel's volume, `0..=128`.
    fn set_master_volume(&mut self, level: u8);

    /// Halt `channel`.
    fn stop_channel(&mut self, channel: ChannelId);

    /// Whether anything is still playing on `channel`.
    fn is_channel_playing(&self, channel: ChannelId) -> bool;
}

/// Input collaborator.
pub trait InputSource {
    /// Drain every event queued since the previous poll.
    fn poll_events(&mut self) -> EventBatch;
}

/// Gameplay collaborator: rules, dungeon, creatures and the player.
///
/// The scheduler fires task actions through the [`TaskDispatcher`]
/// supertrait. The remaining methods are lifecycle hooks the state machine
/// calls at fixed points of its sequences.
pub trait Gameplay: TaskDispatcher {
    /// Reset objects, creatures, parser and player for a fresh game.
    fn reset(&mut self);

    /// Hand out the starting inventory; `autoplay` selects the demo kit.
    fn set_initial_objects(&mut self, autoplay: bool);

    /// Build the current level and place its creatures.
    fn new_level(&mut self);

    /// Clear the text areas, refresh heart and status, and look around.
    fn init_view(&mut self);

    /// Show the command prompt.
    fn prompt(&mut self);

    /// Apply a post-intermission action that gameplay owns (level setup).
    fn level_transition(&mut self, action: PostFadeAction);

    /// A turn animation starts.
    fn begin_turn(&mut self, direction: TurnDirection);

    /// A turn animation ends; `completed` is false when it was aborted.
    fn end_turn(&mut self, direction: TurnDirection, completed: bool);

    /// A step animation starts.
    fn begin_move(&mut self, direction: MoveDirection);

    /// Take the actual step halfway through the animation. May queue a
    /// [`Request::Faint`].
    fn step_move(&mut self, direction: MoveDirection);

    /// A step animation was aborted before it finished.
    fn abort_move(&mut self, direction: MoveDirection);

    /// Whether the player's damage now exceeds their power.
    fn is_lethal(&self) -> bool;

    /// Light level the view returns to after recovering.
    fn base_light_level(&self) -> u8;

    /// Clear the fainted condition.
    fn clear_faint(&mut self);

    /// Discard typed-ahead commands.
    fn clear_input_buffer(&mut self);

    /// Apply a new creature speed multiplier.
    fn update_creature_speed(&mut self, percent: i32);

    /// Take the next transition request raised by a task action.
    fn take_request(&mut self) -> Option<Request>;
}

/// Persistence collaborator. The saved-game format is its own business.
pub trait SaveStore {
    /// Names of the saved games, most recent first.
    fn list_saves(&self) -> Result<Vec<String>, PersistError>;

    /// Write the current game under `name`.
    fn save_game(&mut self, name: &str) -> Result<(), PersistError>;

    /// Restore the game saved under `name`.
    fn load_game(&mut self, name: &str) -> Result<(), PersistError>;

    /// Remove the game saved under `name`.
    fn delete_save(&mut self, name: &str) -> Result<(), PersistError>;

    /// Persist the user settings.
    fn save_options(&mut self, settings: &Settings) -> Result<(), PersistError>;
}

/// Everything one call to the state machine may touch.
///
/// Built fresh by the host each frame; nothing here outlives the call.
pub struct GameContext<'a> {
    /// Scheduler for the current session.
    pub scheduler: &'a mut Scheduler,
    /// Renderer.
    pub view: &'a mut dyn View,
    /// Mixer.
    pub audio: &'a mut dyn Audio,
    /// Event pump.
    pub input: &'a mut dyn InputSource,
    /// Game rules and state.
    pub game: &'a mut dyn Gameplay,
    /// Saved games and options.
    pub saves: &'a mut dyn SaveStore,
    /// User settings edited by the menu.
    pub settings: &'a mut Settings,
    /// Channel completion signals, when the host provides them.
    pub channels: Option<&'a ChannelSync>,
}

impl std::fmt::Debug for GameContext<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameContext")
            .field("scheduler", &self.scheduler)
            .field("settings", &self.settings)
            .field("channels", &self.channels)
            .finish_non_exhaustive()
    }
}

/// Draw `frame` and show it.
pub(crate) fn present(view: &mut dyn View, frame: &Frame<'_>) {
    view.draw_frame(frame);
    view.present_swap();
}

/// Log an audio fault and carry on silently.
pub(crate) fn degrade(result: Result<(), AudioError>, action: &'static str) {
    if let Err(err) = result {
        warn!(error = %err, action, "Audio fault, continuing without sound");
    }
}
