//! Transition requests raised by gameplay code.
//!
//! Task actions cannot reach the presentation state machine directly (it is
//! borrowed by the frame that is running them), so they queue a request that
//! the state machine applies at the top of the next update.

use serde::{Deserialize, Serialize};

use crate::enums::{MoveDirection, PostFadeAction, TurnDirection};

/// A request to move the presentation into a transient sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "request")]
pub enum Request {
    /// Begin the death sequence.
    DeathFade,
    /// Begin the victory sequence.
    VictoryFade,
    /// Begin the intermission with a post-fade action.
    IntermissionFade {
        /// What to do once the fade completes.
        post_action: PostFadeAction,
    },
    /// Open the option menu.
    Menu,
    /// Animate a turn.
    Turn {
        /// Which way to turn.
        direction: TurnDirection,
    },
    /// Animate a step.
    Move {
        /// Which way to step.
        direction: MoveDirection,
    },
    /// Dim the screen as the player faints.
    Faint,
    /// Brighten the screen as the player recovers.
    Recover,
}
