//! Enumeration types shared by the scheduler, the presentation state machine
//! and the host.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Presentation modes
// ---------------------------------------------------------------------------

/// The top-level presentation mode. Exactly one is active at a time.
///
/// Mode-scoped data (fade counters, animation frames, menu cursors) lives in
/// the presentation crate next to the mode it belongs to; this tag is the
/// data-free view used for logging, reporting and host decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GameMode {
    /// Nothing has run yet; the first update bootstraps the session.
    Init,
    /// Title fade with the wizard, buzz and crash sounds.
    FadeIntro,
    /// "PREPARE!" screen before the first level.
    PrepareWait,
    /// Autoplay shows the level map before the demo starts.
    DemoMapWait,
    /// Normal gameplay; the scheduler runs every frame.
    Playing,
    /// Death sequence.
    DeathFade,
    /// Victory sequence.
    WinFade,
    /// Wizard's image destroyed, transition to the next level.
    IntermissionFade,
    /// Top-level option menu.
    Menu,
    /// List sub-dialog spawned by the menu.
    MenuList,
    /// Scrollbar sub-dialog spawned by the menu.
    MenuScrollbar,
    /// Text entry sub-dialog spawned by the menu.
    MenuStringInput,
    /// Pause after a restart before gameplay resumes.
    RestartWait,
    /// Sweep animation for a turn.
    TurnAnimation,
    /// Two-phase step animation.
    MoveAnimation,
    /// Screen dims while the heart races.
    FaintAnimation,
    /// Screen brightens as the player comes round.
    RecoverAnimation,
}

impl GameMode {
    /// True for the menu family, during which the scheduler is paused.
    pub const fn is_menu(self) -> bool {
        matches!(
            self,
            Self::Menu | Self::MenuList | Self::MenuScrollbar | Self::MenuStringInput
        )
    }

    /// True for the animations that keep the scheduler clock running.
    pub const fn is_animation(self) -> bool {
        matches!(
            self,
            Self::TurnAnimation
                | Self::MoveAnimation
                | Self::FaintAnimation
                | Self::RecoverAnimation
        )
    }
}

// ---------------------------------------------------------------------------
// Fades
// ---------------------------------------------------------------------------

/// Which of the four fade sequences is running.
///
/// Ordering matters: variants before [`FadeVariant::Death`] show a message
/// between the two crashes; the later ones hold at wait-for-key instead.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadeVariant {
    /// Title sequence at startup.
    Begin,
    /// Intermission after the wizard's image is killed.
    Middle,
    /// Player death.
    Death,
    /// Player victory.
    Victory,
}

impl FadeVariant {
    /// True when the sequence shows its message and then buzzes out.
    pub const fn has_message(self) -> bool {
        matches!(self, Self::Begin | Self::Middle)
    }

    /// True when a key press may skip the message and buzz-out phases.
    pub const fn key_skips_tail(self) -> bool {
        !matches!(self, Self::Middle)
    }

    /// The message shown while this fade runs.
    pub const fn message(self) -> Message {
        match self {
            Self::Begin => Message::Welcome,
            Self::Middle => Message::Enough,
            Self::Death => Message::Death,
            Self::Victory => Message::Winner,
        }
    }
}

/// Sub-phase of the shared fade sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FadePhase {
    /// Wizard fades in while the buzz swells.
    BuzzIn,
    /// First crash sound.
    Crash,
    /// Message shown (begin and middle only).
    Message,
    /// Second crash sound.
    Crash2,
    /// Wizard fades out while the buzz dies away.
    BuzzOut,
    /// Holding for a key (death and victory).
    WaitKey,
    /// Sequence finished.
    Done,
}

/// What the intermission fade does once it completes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostFadeAction {
    /// Return straight to playing.
    #[default]
    None,
    /// Restart the game.
    Restart,
    /// Move the player to level 3 after killing the wizard's image.
    Level3Setup,
    /// Treat the intermission as a victory.
    Victory,
}

// ---------------------------------------------------------------------------
// Movement
// ---------------------------------------------------------------------------

/// Direction of a turn request, matching the parser's direction codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnDirection {
    /// Quarter turn counter-clockwise.
    Left,
    /// Quarter turn clockwise.
    Right,
    /// Half turn.
    Around,
}

/// Direction of a step request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MoveDirection {
    /// Step forward (animated).
    Forward,
    /// Step back (animated).
    Back,
    /// Side step left (not animated).
    Left,
    /// Side step right (not animated).
    Right,
}

impl MoveDirection {
    /// True for the directions that use the two-phase step animation.
    pub const fn is_animated(self) -> bool {
        matches!(self, Self::Forward | Self::Back)
    }
}

// ---------------------------------------------------------------------------
// View and audio vocabulary
// ---------------------------------------------------------------------------

/// A text region of the screen that can be cleared independently.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Region {
    /// Status line (hand contents, heart).
    Status,
    /// Primary text area (prompt, messages).
    Primary,
}

/// Canned messages the view can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Message {
    /// Copyright banner.
    Copyright,
    /// Title welcome text.
    Welcome,
    /// "PREPARE!" before a level starts.
    Prepare,
    /// Intermission taunt.
    Enough,
    /// Death epitaph.
    Death,
    /// Victory text.
    Winner,
}

/// Sound clips the presentation asks the audio collaborator to play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Clip {
    /// Looping wizard buzz.
    Buzz,
    /// Crash heard when the wizard appears.
    Kaboom,
    /// Slow heartbeat.
    HeartSlow,
    /// Fast heartbeat.
    HeartFast,
}

/// How many times a clip repeats after its first play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopCount {
    /// Play once.
    Once,
    /// Repeat until stopped.
    Forever,
}

/// Rendering style selected from the graphics menu.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GraphicsMode {
    /// Original low-resolution look.
    #[default]
    Normal,
    /// High-resolution lines.
    HiRes,
    /// Vector display.
    Vector,
}

impl GraphicsMode {
    /// The mode selected by a row of the graphics list.
    pub const fn from_choice(choice: usize) -> Option<Self> {
        match choice {
            0 => Some(Self::Normal),
            1 => Some(Self::HiRes),
            2 => Some(Self::Vector),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fade_variant_ordering_splits_message_and_wait_key() {
        assert!(FadeVariant::Begin < FadeVariant::Death);
        assert!(FadeVariant::Middle < FadeVariant::Death);
        assert!(FadeVariant::Begin.has_message());
        assert!(!FadeVariant::Victory.has_message());
        assert!(!FadeVariant::Middle.key_skips_tail());
        assert!(FadeVariant::Death.key_skips_tail());
    }

    #[test]
    fn mode_families() {
        assert!(GameMode::MenuScrollbar.is_menu());
        assert!(!GameMode::Playing.is_menu());
        assert!(GameMode::FaintAnimation.is_animation());
        assert!(!GameMode::DeathFade.is_animation());
    }

    #[test]
    fn graphics_choices() {
        assert_eq!(GraphicsMode::from_choice(1), Some(GraphicsMode::HiRes));
        assert_eq!(GraphicsMode::from_choice(3), None);
    }

    #[test]
    fn only_forward_and_back_are_animated() {
        assert!(MoveDirection::Forward.is_animated());
        assert!(MoveDirection::Back.is_animated());
        assert!(!MoveDirection::Left.is_animated());
    }
}
