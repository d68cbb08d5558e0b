//! One rendered frame: presentation first, then gameplay, then round
//! bookkeeping.
//!
//! [`run_frame`] is what the host calls at its render rate. The
//! presentation decides whether gameplay runs; if it does, the scheduler
//! fires whatever tasks are due. A finished round (death, victory, a full
//! cycle, or the player taking over from the demo) restarts through
//! [`Presentation::finish_round`].

use daggorath_types::GameMode;
use tracing::{debug, info};

use crate::collaborators::GameContext;
use crate::machine::{Presentation, SessionEvent};

/// What happened during one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameSummary {
    /// Mode after the frame.
    pub mode: GameMode,
    /// Whether the scheduler ran.
    pub gameplay_ran: bool,
    /// Fixed ticks the scheduler consumed.
    pub ticks: u32,
    /// Task actions fired.
    pub fired: u32,
    /// Whether a round ended and a new one started.
    pub round_finished: bool,
}

/// Run one frame at host time `now`.
pub fn run_frame(presentation: &mut Presentation, now: u64, ctx: &mut GameContext<'_>) -> FrameSummary {
    let mut summary = FrameSummary {
        mode: presentation.mode(),
        gameplay_ran: false,
        ticks: 0,
        fired: 0,
        round_finished: false,
    };

    if !presentation.update_state(now, ctx) {
        summary.mode = presentation.mode();
        return summary;
    }

    match presentation.take_event() {
        Some(event @ (SessionEvent::DeathComplete | SessionEvent::VictoryComplete)) => {
            info!(event = ?event, autoplay = presentation.session().autoplay, "Round over");
            presentation.finish_round(now, ctx);
            summary.round_finished = true;
            summary.mode = presentation.mode();
            return summary;
        }
        Some(SessionEvent::NewGame) => debug!("New game requested from menu"),
        None => {}
    }

    if presentation.mode() != GameMode::Playing {
        summary.mode = presentation.mode();
        return summary;
    }

    let report = ctx.scheduler.advance_and_fire(now, &mut *ctx.game);
    summary.gameplay_ran = true;
    summary.ticks = report.ticks;
    summary.fired = report.fired;

    if report.cycle_complete || presentation.session().has_won {
        info!(
            cycle_complete = report.cycle_complete,
            has_won = presentation.session().has_won,
            "Round over"
        );
        presentation.finish_round(now, ctx);
        summary.round_finished = true;
    }
    summary.mode = presentation.mode();
    summary
}
