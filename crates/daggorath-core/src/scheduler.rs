//! The task scheduler: fixed-tick clock plus task control block table.
//!
//! Each call to [`Scheduler::advance_and_fire`] converts the wall-clock time
//! since the previous call into whole ticks (at most the catch-up cap) and,
//! for every tick, fires each due block in slot order. Actions live behind
//! the [`TaskDispatcher`] trait so the scheduler stays ignorant of gameplay.
//!
//! # Pause semantics
//!
//! While paused no tick is consumed, and time spent paused is discarded:
//! the first advance after resuming only re-establishes the frame reference.
//! Gameplay timers therefore never race to catch up after a menu closes.

use daggorath_types::TaskId;
use tracing::{debug, info, warn};

use crate::clock::ClockState;
use crate::config::GameConfig;
use crate::task::{Baseline, MS_PER_MINUTE, TaskClass, TaskTable};

/// Errors from the fallible scheduler configuration helpers.
///
/// The tick loop itself never fails.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// No block occupies the given slot.
    #[error("no task control block in slot {id}")]
    UnknownTask {
        /// The slot that was addressed.
        id: TaskId,
    },

    /// Every creature movement slot is already handed out.
    #[error("task table full: all {capacity} slots in use")]
    TableFull {
        /// Total table capacity.
        capacity: usize,
    },
}

/// What a fired action reports back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskOutcome {
    /// Nothing of note.
    Continue,
    /// The action finished a full game cycle; higher-level save or restart
    /// logic may now run.
    CycleComplete,
}

/// Runs the action associated with a fired block.
///
/// Implementations may re-arm or disable any block, including the one being
/// fired, through `tasks`. The fired block has already been re-armed by
/// exactly one period when this is called.
pub trait TaskDispatcher {
    /// Run the action for `id` at simulated time `now`.
    fn fire(&mut self, id: TaskId, tasks: &mut TaskTable, now: u64) -> TaskOutcome;
}

/// Summary of one scheduler advance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickReport {
    /// Fixed ticks consumed.
    pub ticks: u32,
    /// Actions fired across all ticks.
    pub fired: u32,
    /// Whether any action reported [`TaskOutcome::CycleComplete`].
    pub cycle_complete: bool,
}

/// Owns the clock and the task table for one game session.
#[derive(Debug, Clone)]
pub struct Scheduler {
    clock: ClockState,
    tasks: TaskTable,
    baseline: Baseline,
    creature_move_ms: i64,
    paused: bool,
    resync_pending: bool,
    cancel: bool,
    blocking_allowed: bool,
}

impl Scheduler {
    /// Build a scheduler from configuration and install the baseline.
    pub fn new(config: &GameConfig) -> Self {
        let baseline =
            Baseline::from_config(&config.timing, config.settings.creature_regen_minutes);
        let mut tasks = TaskTable::new(baseline.creature_slots());
        tasks.install(&baseline, 0);
        Self {
            clock: ClockState::new(config.timing.tick_step_ms, config.timing.max_catchup_ticks),
            tasks,
            baseline,
            creature_move_ms: config.timing.creature_move_ms,
            paused: false,
            resync_pending: false,
            cancel: false,
            blocking_allowed: config.host.blocking_waits,
        }
    }

    /// Reset every block to its startup period and phase.
    ///
    /// First fires are scheduled relative to the current simulated time.
    /// Calling this twice in a row leaves the same table.
    pub fn install_baseline(&mut self) {
        self.tasks.install(&self.baseline, self.clock.sim_time());
        debug!(
            sim_time = self.clock.sim_time(),
            slots = self.tasks.len(),
            "Installed baseline task set"
        );
    }

    /// Advance the clock to `now` and fire every due block.
    pub fn advance_and_fire<D>(&mut self, now: u64, dispatcher: &mut D) -> TickReport
    where
        D: TaskDispatcher + ?Sized,
    {
        self.advance(now, None, dispatcher)
    }

    /// Advance the clock to `now`, firing only timer-class blocks.
    ///
    /// Used while an animation owns the screen. Interactive blocks that fall
    /// due meanwhile skip the missed fires and keep their phase.
    pub fn advance_timers<D>(&mut self, now: u64, dispatcher: &mut D) -> TickReport
    where
        D: TaskDispatcher + ?Sized,
    {
        self.advance(now, Some(TaskClass::Timer), dispatcher)
    }

    fn advance<D>(&mut self, now: u64, only: Option<TaskClass>, dispatcher: &mut D) -> TickReport
    where
        D: TaskDispatcher + ?Sized,
    {
        let mut report = TickReport::default();

        if !self.clock.is_primed() {
            let shift = self.clock.prime(now);
            self.tasks.shift(shift);
            debug!(now, "Scheduler clock primed");
            return report;
        }
        if self.paused {
            self.clock.resync(now);
            return report;
        }
        if self.resync_pending {
            self.resync_pending = false;
            self.clock.resync(now);
            return report;
        }

        self.clock.observe(now);
        while report.ticks < self.clock.max_catchup() && self.clock.take_tick() {
            report.ticks = report.ticks.saturating_add(1);
            self.fire_due(only, dispatcher, &mut report);
        }

        if report.ticks >= self.clock.max_catchup() && self.clock.accumulator() > 0 {
            debug!(
                ticks = report.ticks,
                dropped_ms = self.clock.accumulator(),
                "Catch-up cap reached"
            );
            self.clock.discard();
        }
        report
    }

    fn fire_due<D>(&mut self, only: Option<TaskClass>, dispatcher: &mut D, report: &mut TickReport)
    where
        D: TaskDispatcher + ?Sized,
    {
        let sim = self.clock.sim_time();
        for index in 0..self.tasks.len() {
            let Some(block) = self.tasks.slot_mut(index) else {
                continue;
            };
            if !block.is_due(sim) {
                continue;
            }
            if only.is_some_and(|class| class != block.class()) {
                block.skip_missed(sim);
                continue;
            }
            let id = block.id();
            block.rearm();
            report.fired = report.fired.saturating_add(1);
            if dispatcher.fire(id, &mut self.tasks, sim) == TaskOutcome::CycleComplete {
                report.cycle_complete = true;
            }
        }
    }

    /// Suspend (`true`) or resume (`false`) tick consumption.
    ///
    /// Elapsed time while paused is never replayed.
    pub fn pause(&mut self, flag: bool) {
        if flag == self.paused {
            return;
        }
        self.paused = flag;
        if flag {
            self.clock.discard();
        } else {
            self.resync_pending = true;
        }
        info!(paused = flag, "Scheduler pause state changed");
    }

    /// Whether tick consumption is suspended.
    pub const fn is_paused(&self) -> bool {
        self.paused
    }

    /// Raise the sticky cancel flag.
    pub const fn request_cancel(&mut self) {
        self.cancel = true;
    }

    /// Whether a cancel is pending. Does not clear the flag.
    pub const fn cancel_requested(&self) -> bool {
        self.cancel
    }

    /// Consume the cancel flag, returning whether it was set.
    pub const fn take_cancel(&mut self) -> bool {
        let was = self.cancel;
        self.cancel = false;
        was
    }

    /// Change one block's period from its next scheduled fire onward.
    ///
    /// A non-positive period disables the block. A disabled block given a
    /// positive period is enabled and first fires one period from now.
    ///
    /// A block fires at most once per tick. With a period shorter than the
    /// tick its `next_fire` falls further behind the clock on every tick.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownTask`] if `id` addresses no slot.
    pub fn reconfigure_period(&mut self, id: TaskId, period_ms: i64) -> Result<(), SchedulerError> {
        let sim = self.clock.sim_time();
        let block = self
            .tasks
            .get_mut(id)
            .ok_or(SchedulerError::UnknownTask { id })?;
        let Ok(period) = u64::try_from(period_ms) else {
            warn!(task = %id, period_ms, "Non-positive task period, disabling block");
            block.disable();
            return Ok(());
        };
        if period == 0 {
            warn!(task = %id, period_ms, "Non-positive task period, disabling block");
            block.disable();
        } else if block.is_enabled() {
            block.set_period(period);
        } else {
            block.arm(period, sim.saturating_add(period));
        }
        debug!(task = %id, period_ms, "Task period reconfigured");
        Ok(())
    }

    /// Set the creature regeneration interval in minutes.
    ///
    /// Updates both the live block and the baseline, so the new interval
    /// survives the next reset.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::UnknownTask`] if the table has no regen slot.
    pub fn update_creature_regen(&mut self, minutes: u32) -> Result<(), SchedulerError> {
        self.baseline.set_creature_regen_minutes(minutes);
        let period = i64::from(minutes).saturating_mul(MS_PER_MINUTE);
        self.reconfigure_period(TaskId::CREATURE_REGEN, period)
    }

    /// Hand out an unused creature movement slot.
    ///
    /// # Errors
    ///
    /// Returns [`SchedulerError::TableFull`] once every slot is taken.
    pub fn allocate_creature_slot(&mut self) -> Result<TaskId, SchedulerError> {
        self.tasks
            .allocate_creature_slot()
            .ok_or(SchedulerError::TableFull {
                capacity: self.tasks.len(),
            })
    }

    /// Period gameplay uses for creature movement slots.
    pub const fn creature_move_ms(&self) -> i64 {
        self.creature_move_ms
    }

    /// Whether the host lets the channel primitive block.
    pub const fn can_block(&self) -> bool {
        self.blocking_allowed
    }

    /// Current simulated time.
    pub const fn sim_time(&self) -> u64 {
        self.clock.sim_time()
    }

    /// Clock state, for inspection.
    pub const fn clock(&self) -> &ClockState {
        &self.clock
    }

    /// The task table.
    pub const fn tasks(&self) -> &TaskTable {
        &self.tasks
    }

    /// The task table, for gameplay code that arms or disables blocks.
    pub const fn tasks_mut(&mut self) -> &mut TaskTable {
        &mut self.tasks
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// Records every fire; optionally reports a cycle on one id.
    #[derive(Default)]
    struct Recorder {
        fired: Vec<(TaskId, u64)>,
        cycle_on: Option<TaskId>,
    }

    impl TaskDispatcher for Recorder {
        fn fire(&mut self, id: TaskId, _tasks: &mut TaskTable, now: u64) -> TaskOutcome {
            self.fired.push((id, now));
            if self.cycle_on == Some(id) {
                TaskOutcome::CycleComplete
            } else {
                TaskOutcome::Continue
            }
        }
    }

    fn config(yaml: &str) -> GameConfig {
        GameConfig::parse(yaml).unwrap()
    }

    /// Only the clock block enabled, period `p`.
    fn single_block(p: i64) -> Scheduler {
        let yaml = format!(
            "timing:\n  clock_ms: {p}\n  player_ms: 0\n  refresh_display_ms: 0\n  heart_slow_ms: 0\n  torch_burn_ms: 0\n  creature_slots: 0\nsettings:\n  creature_regen_minutes: 0\n"
        );
        Scheduler::new(&config(&yaml))
    }

    #[test]
    fn first_advance_primes_without_firing() {
        let mut sched = single_block(17);
        let mut rec = Recorder::default();
        let report = sched.advance_and_fire(10_000, &mut rec);
        assert_eq!(report, TickReport::default());
        assert_eq!(sched.sim_time(), 10_000);
        assert_eq!(sched.tasks().get(TaskId::CLOCK).unwrap().next_fire(), 10_000);
    }

    #[test]
    fn rearm_follows_original_phase_under_irregular_frames() {
        let mut sched = single_block(51);
        let mut rec = Recorder::default();
        sched.advance_and_fire(0, &mut rec);
        let mut now = 0;
        for delta in [5, 40, 3, 33, 60, 16, 16, 90, 1, 17, 120, 7].repeat(10) {
            now += delta;
            sched.advance_and_fire(now, &mut rec);
        }
        let block = sched.tasks().get(TaskId::CLOCK).unwrap();
        let fires = u64::try_from(rec.fired.len()).unwrap();
        assert!(fires > 10);
        assert_eq!(block.next_fire(), fires * 51);
    }

    #[test]
    fn catch_up_is_capped() {
        let mut sched = single_block(17);
        let mut rec = Recorder::default();
        sched.advance_and_fire(0, &mut rec);
        let report = sched.advance_and_fire(3_600_000, &mut rec);
        assert_eq!(report.ticks, 10);
        assert!(report.fired <= 10);
        // The backlog beyond the cap is dropped, not carried.
        let next = sched.advance_and_fire(3_600_000, &mut rec);
        assert_eq!(next.ticks, 0);
    }

    #[test]
    fn pause_discards_elapsed_time() {
        let mut sched = single_block(17);
        let mut rec = Recorder::default();
        sched.advance_and_fire(0, &mut rec);
        sched.advance_and_fire(100, &mut rec);
        let before = rec.fired.len();

        sched.pause(true);
        assert!(sched.is_paused());
        for t in (200..5_000).step_by(16) {
            assert_eq!(sched.advance_and_fire(t, &mut rec).ticks, 0);
        }
        sched.pause(false);
        let resumed = sched.advance_and_fire(60_000, &mut rec);
        assert_eq!(resumed.ticks, 0);
        assert_eq!(rec.fired.len(), before);

        let next = sched.advance_and_fire(60_017, &mut rec);
        assert_eq!(next.ticks, 1);
    }

    #[test]
    fn cycle_complete_is_reported() {
        let mut sched = single_block(17);
        let mut rec = Recorder {
            cycle_on: Some(TaskId::CLOCK),
            ..Recorder::default()
        };
        sched.advance_and_fire(0, &mut rec);
        assert!(sched.advance_and_fire(17, &mut rec).cycle_complete);
    }

    #[test]
    fn cancel_flag_is_sticky_until_taken() {
        let mut sched = single_block(17);
        sched.request_cancel();
        assert!(sched.cancel_requested());
        assert!(sched.cancel_requested());
        assert!(sched.take_cancel());
        assert!(!sched.cancel_requested());
        assert!(!sched.take_cancel());
    }

    #[test]
    fn reconfigure_takes_effect_after_next_fire() {
        let mut sched = single_block(100);
        let mut rec = Recorder::default();
        sched.advance_and_fire(0, &mut rec);
        sched.advance_and_fire(17, &mut rec);
        assert_eq!(sched.tasks().get(TaskId::CLOCK).unwrap().next_fire(), 100);

        sched.reconfigure_period(TaskId::CLOCK, 40).unwrap();
        assert_eq!(sched.tasks().get(TaskId::CLOCK).unwrap().next_fire(), 100);
        for t in (34..=170).step_by(17) {
            sched.advance_and_fire(t, &mut rec);
        }
        assert_eq!(sched.tasks().get(TaskId::CLOCK).unwrap().next_fire(), 180);
    }

    #[test]
    fn non_positive_period_disables() {
        let mut sched = single_block(17);
        sched.reconfigure_period(TaskId::CLOCK, -3).unwrap();
        assert!(!sched.tasks().get(TaskId::CLOCK).unwrap().is_enabled());
        sched.reconfigure_period(TaskId::CLOCK, 0).unwrap();
        assert!(!sched.tasks().get(TaskId::CLOCK).unwrap().is_enabled());
    }

    #[test]
    fn unknown_slot_is_an_error() {
        let mut sched = single_block(17);
        let err = sched.reconfigure_period(TaskId(200), 17).unwrap_err();
        assert!(matches!(err, SchedulerError::UnknownTask { .. }));
    }

    #[test]
    fn timers_only_advance_skips_interactive_blocks() {
        let mut sched = Scheduler::new(&GameConfig::default());
        let mut rec = Recorder::default();
        sched.advance_and_fire(0, &mut rec);
        for t in (17..=170).step_by(17) {
            sched.advance_timers(t, &mut rec);
        }
        assert!(rec.fired.iter().all(|(id, _)| *id != TaskId::PLAYER));
        assert!(rec.fired.iter().any(|(id, _)| *id == TaskId::CLOCK));
        let player = sched.tasks().get(TaskId::PLAYER).unwrap();
        assert!(player.next_fire() > sched.sim_time());
    }

    #[test]
    fn regen_update_survives_reset() {
        let mut sched = Scheduler::new(&GameConfig::default());
        sched.update_creature_regen(2).unwrap();
        sched.install_baseline();
        let block = sched.tasks().get(TaskId::CREATURE_REGEN).unwrap();
        assert_eq!(block.period_ms(), 120_000);
    }
}
