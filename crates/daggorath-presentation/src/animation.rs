//! Timed gameplay animations: turning, stepping, fainting and recovering.
//!
//! Each animation is a small value owned by the mode it runs in. It keeps
//! its own deadlines in host milliseconds and advances them by whole
//! durations so frames land on `start + k * duration` however unevenly the
//! host calls in.

use daggorath_types::{MoveDirection, TurnDirection};
use tracing::{debug, warn};

use crate::collaborators::{Frame, GameContext, present};

/// Frames in a quarter turn.
const QUARTER_TURN_FRAMES: u8 = 8;

/// Pixels the sweep line moves per frame.
const SWEEP_STRIDE: i32 = 32;

/// Screen light level a faint dims down to, and a recovery starts from.
pub const FAINT_LIGHT: u8 = 248;

/// How an animation update went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationStatus {
    /// More frames to come.
    Running,
    /// Ran to completion.
    Finished,
    /// Cut short; gameplay has been told.
    Aborted,
}

/// The vertical-line sweep drawn while the player turns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TurnAnimation {
    direction: TurnDirection,
    frame: u8,
    total: u8,
    sign: i32,
    offset: i32,
    duration: u64,
    next_frame_at: u64,
}

impl TurnAnimation {
    /// Start turning at `now`, drawing the first frame immediately.
    pub fn start(
        direction: TurnDirection,
        now: u64,
        frame_ms: u64,
        ctx: &mut GameContext<'_>,
    ) -> Self {
        let (offset, sign, total) = match direction {
            TurnDirection::Left => (8, 1, QUARTER_TURN_FRAMES),
            TurnDirection::Right => (248, -1, QUARTER_TURN_FRAMES),
            TurnDirection::Around => (248, -1, QUARTER_TURN_FRAMES.saturating_mul(2)),
        };
        ctx.game.begin_turn(direction);
        let mut anim = Self {
            direction,
            frame: 0,
            total,
            sign,
            offset,
            duration: frame_ms,
            next_frame_at: now,
        };
        anim.draw_next(ctx);
        debug!(direction = ?direction, frames = total, frame_ms, "Turn started");
        anim
    }

    /// Direction of the turn.
    pub const fn direction(&self) -> TurnDirection {
        self.direction
    }

    /// Frames drawn so far.
    pub const fn frames_drawn(&self) -> u8 {
        self.frame
    }

    /// Draw whatever frames are due; finish once every frame has had its
    /// full duration on screen.
    pub fn update(&mut self, now: u64, abort: bool, ctx: &mut GameContext<'_>) -> AnimationStatus {
        ctx.scheduler.advance_timers(now, &mut *ctx.game);
        if abort {
            ctx.game.end_turn(self.direction, false);
            debug!(direction = ?self.direction, frame = self.frame, "Turn aborted");
            return AnimationStatus::Aborted;
        }
        while now >= self.next_frame_at {
            if self.frame >= self.total {
                ctx.game.end_turn(self.direction, true);
                present(ctx.view, &Frame::Dungeon);
                return AnimationStatus::Finished;
            }
            self.draw_next(ctx);
        }
        AnimationStatus::Running
    }

    /// Sweep line position for frame `frame`.
    pub fn sweep_x(&self, frame: u8) -> i32 {
        let column = i32::from(frame % QUARTER_TURN_FRAMES);
        column
            .saturating_mul(SWEEP_STRIDE)
            .saturating_mul(self.sign)
            .saturating_add(self.offset)
    }

    fn draw_next(&mut self, ctx: &mut GameContext<'_>) {
        let x = self.sweep_x(self.frame);
        present(ctx.view, &Frame::TurnSweep { x });
        self.frame = self.frame.saturating_add(1);
        self.next_frame_at = self.next_frame_at.saturating_add(self.duration);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum StepPhase {
    Stepping,
    Settling,
}

/// A two-phase step: the move lands halfway, then the view settles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveAnimation {
    direction: MoveDirection,
    phase: StepPhase,
    half: u64,
    next_at: u64,
}

impl MoveAnimation {
    /// Start a step at `now`. Returns `None` for directions that are not
    /// animated (side steps).
    pub fn start(
        direction: MoveDirection,
        now: u64,
        move_delay_ms: u64,
        ctx: &mut GameContext<'_>,
    ) -> Option<Self> {
        if !direction.is_animated() {
            return None;
        }
        let half = move_delay_ms / 2;
        ctx.game.begin_move(direction);
        debug!(direction = ?direction, half_ms = half, "Step started");
        Some(Self {
            direction,
            phase: StepPhase::Stepping,
            half,
            next_at: now.saturating_add(half),
        })
    }

    /// Direction of the step.
    pub const fn direction(&self) -> MoveDirection {
        self.direction
    }

    /// Whether the step itself has been taken.
    pub fn stepped(&self) -> bool {
        self.phase == StepPhase::Settling
    }

    /// Advance the step.
    pub fn update(&mut self, now: u64, abort: bool, ctx: &mut GameContext<'_>) -> AnimationStatus {
        ctx.scheduler.advance_timers(now, &mut *ctx.game);
        if abort {
            ctx.game.abort_move(self.direction);
            return AnimationStatus::Aborted;
        }
        if now < self.next_at {
            return AnimationStatus::Running;
        }
        match self.phase {
            StepPhase::Stepping => {
                ctx.game.step_move(self.direction);
                present(ctx.view, &Frame::Dungeon);
                self.phase = StepPhase::Settling;
                self.next_at = self.next_at.saturating_add(self.half);
                AnimationStatus::Running
            }
            StepPhase::Settling => AnimationStatus::Finished,
        }
    }
}

/// Whether a light ramp dims or brightens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RampKind {
    /// Dim towards [`FAINT_LIGHT`].
    Faint,
    /// Brighten back to the level's base light.
    Recover,
}

impl RampKind {
    /// Light level one step after `level`, wrapping at the ends of the range.
    pub const fn next_level(self, level: u8) -> u8 {
        match self {
            Self::Faint => level.wrapping_sub(1),
            Self::Recover => level.wrapping_add(1),
        }
    }
}

/// One-level-per-step change of the screen light.
///
/// Light levels wrap: a faint dims from the base level through zero round
/// to [`FAINT_LIGHT`]. The step limit ends the ramp even if the target is
/// never hit exactly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LightRamp {
    kind: RampKind,
    target: u8,
    steps: u16,
    limit: u16,
    step_ms: u64,
    next_at: u64,
    reached: bool,
}

impl LightRamp {
    /// Start a ramp at `now`, taking the first step immediately.
    pub fn start(
        kind: RampKind,
        now: u64,
        step_ms: u64,
        limit: u16,
        ctx: &mut GameContext<'_>,
    ) -> Self {
        let target = match kind {
            RampKind::Faint => FAINT_LIGHT,
            RampKind::Recover => {
                ctx.view.set_light_level(FAINT_LIGHT);
                ctx.game.base_light_level()
            }
        };
        let mut ramp = Self {
            kind,
            target,
            steps: 0,
            limit,
            step_ms,
            next_at: now,
            reached: false,
        };
        debug!(kind = ?kind, target, limit, "Light ramp started");
        ramp.step(ctx);
        ramp
    }

    /// Which way the ramp runs.
    pub const fn kind(&self) -> RampKind {
        self.kind
    }

    /// Light level the ramp ends at.
    pub const fn target(&self) -> u8 {
        self.target
    }

    /// Steps taken so far.
    pub const fn steps(&self) -> u16 {
        self.steps
    }

    /// Take every step that is due.
    pub fn update(&mut self, now: u64, ctx: &mut GameContext<'_>) -> AnimationStatus {
        ctx.scheduler.advance_timers(now, &mut *ctx.game);
        while !self.reached && now >= self.next_at {
            self.step(ctx);
        }
        if self.reached {
            AnimationStatus::Finished
        } else {
            AnimationStatus::Running
        }
    }

    fn step(&mut self, ctx: &mut GameContext<'_>) {
        let level = self.kind.next_level(ctx.view.light_level());
        match self.kind {
            RampKind::Faint => {
                ctx.view.set_light_level(level);
                present(ctx.view, &Frame::Dungeon);
            }
            RampKind::Recover => {
                present(ctx.view, &Frame::Dungeon);
                ctx.view.set_light_level(level);
            }
        }
        self.steps = self.steps.saturating_add(1);
        self.next_at = self.next_at.saturating_add(self.step_ms);
        if level == self.target || self.steps >= self.limit {
            if level != self.target {
                warn!(kind = ?self.kind, level, target = self.target, "Light ramp hit its step limit");
            }
            self.reached = true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn turn(direction: TurnDirection) -> TurnAnimation {
        let (offset, sign) = match direction {
            TurnDirection::Left => (8, 1),
            TurnDirection::Right | TurnDirection::Around => (248, -1),
        };
        TurnAnimation {
            direction,
            frame: 0,
            total: QUARTER_TURN_FRAMES,
            sign,
            offset,
            duration: 37,
            next_frame_at: 0,
        }
    }

    #[test]
    fn left_sweep_moves_right_across_the_screen() {
        let anim = turn(TurnDirection::Left);
        let xs: Vec<i32> = (0..8).map(|f| anim.sweep_x(f)).collect();
        assert_eq!(xs, vec![8, 40, 72, 104, 136, 168, 200, 232]);
    }

    #[test]
    fn fainting_from_darkness_wraps_to_the_top() {
        let mut level = 0;
        let mut seen = Vec::new();
        for _ in 0..4 {
            level = RampKind::Faint.next_level(level);
            seen.push(level);
        }
        assert_eq!(seen, vec![255, 254, 253, 252]);

        let after = |steps: usize| (0..steps).fold(0_u8, |l, _| RampKind::Faint.next_level(l));
        assert_eq!(after(8), 248);
        assert_eq!(after(255), 1);
        assert_eq!(after(256), 0);
    }

    #[test]
    fn recovering_from_the_top_wraps_to_zero() {
        assert_eq!(RampKind::Recover.next_level(255), 0);
        assert_eq!(RampKind::Recover.next_level(248), 249);
    }

    #[test]
    fn around_sweep_repeats_the_right_sweep() {
        let anim = turn(TurnDirection::Around);
        assert_eq!(anim.sweep_x(0), 248);
        assert_eq!(anim.sweep_x(7), 24);
        assert_eq!(anim.sweep_x(8), anim.sweep_x(0));
    }
}
