//! Fixed-tick clock with delta-time compensation.
//!
//! The host calls the scheduler with wall-clock milliseconds at whatever
//! rate it renders. [`ClockState`] turns those irregular frame deltas into a
//! whole number of fixed ticks, each of which advances simulated time by
//! exactly one tick step.
//!
//! # Invariants
//!
//! - Simulated time only ever moves forward, one tick step at a time.
//! - The accumulator never holds more than `max_catchup` ticks of backlog;
//!   anything beyond that is dropped so a long stall cannot snowball.
//! - A wall clock that runs backwards contributes zero elapsed time.

/// Clock state shared by every scheduler advance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockState {
    /// Simulated time in milliseconds, in the clock-source domain once primed.
    sim_time: u64,

    /// Wall-clock time observed on the previous frame, `None` until primed.
    last_frame: Option<u64>,

    /// Elapsed wall-clock time not yet converted into ticks.
    accumulator: u64,

    /// Length of one fixed tick in milliseconds (at least 1).
    tick_step: u64,

    /// Maximum number of ticks consumed by one advance (at least 1).
    max_catchup: u32,
}

impl ClockState {
    /// Create an unprimed clock.
    ///
    /// A zero tick step or catch-up cap is raised to 1 so the clock can
    /// always make progress.
    pub fn new(tick_step_ms: u64, max_catchup: u32) -> Self {
        Self {
            sim_time: 0,
            last_frame: None,
            accumulator: 0,
            tick_step: tick_step_ms.max(1),
            max_catchup: max_catchup.max(1),
        }
    }

    /// True once the first wall-clock reading has been adopted.
    pub const fn is_primed(&self) -> bool {
        self.last_frame.is_some()
    }

    /// Adopt `now` as both the frame time and the simulated time.
    ///
    /// Returns how far simulated time jumped forward, so callers can shift
    /// anything scheduled against the unprimed time base. A `now` earlier
    /// than the current simulated time leaves simulated time untouched.
    pub fn prime(&mut self, now: u64) -> u64 {
        let shift = now.saturating_sub(self.sim_time);
        self.sim_time = self.sim_time.max(now);
        self.last_frame = Some(now);
        self.accumulator = 0;
        shift
    }

    /// Record a frame at `now` and bank its elapsed time.
    ///
    /// Returns the elapsed milliseconds since the previous frame.
    pub fn observe(&mut self, now: u64) -> u64 {
        let elapsed = self
            .last_frame
            .map_or(0, |last| now.saturating_sub(last));
        self.last_frame = Some(now);
        self.accumulator = self
            .accumulator
            .saturating_add(elapsed)
            .min(self.backlog_limit());
        elapsed
    }

    /// Consume one tick from the accumulator if a whole tick is banked.
    pub const fn take_tick(&mut self) -> bool {
        if self.accumulator < self.tick_step {
            return false;
        }
        self.accumulator = self.accumulator.saturating_sub(self.tick_step);
        self.sim_time = self.sim_time.saturating_add(self.tick_step);
        true
    }

    /// Forget banked time and restart elapsed measurement from `now`.
    ///
    /// Used while paused and on resume: time spent paused is never replayed.
    pub const fn resync(&mut self, now: u64) {
        self.last_frame = Some(now);
        self.accumulator = 0;
    }

    /// Drop any banked time without touching the frame reference.
    pub const fn discard(&mut self) {
        self.accumulator = 0;
    }

    /// Current simulated time in milliseconds.
    pub const fn sim_time(&self) -> u64 {
        self.sim_time
    }

    /// Wall-clock time of the previous frame, if primed.
    pub const fn last_frame(&self) -> Option<u64> {
        self.last_frame
    }

    /// Banked milliseconds not yet consumed.
    pub const fn accumulator(&self) -> u64 {
        self.accumulator
    }

    /// Length of one tick in milliseconds.
    pub const fn tick_step(&self) -> u64 {
        self.tick_step
    }

    /// Maximum ticks per advance.
    pub const fn max_catchup(&self) -> u32 {
        self.max_catchup
    }

    fn backlog_limit(&self) -> u64 {
        self.tick_step
            .saturating_mul(u64::from(self.max_catchup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unprimed_clock_banks_nothing() {
        let mut clock = ClockState::new(17, 10);
        assert!(!clock.is_primed());
        assert_eq!(clock.observe(1_000), 0);
        assert!(!clock.take_tick());
    }

    #[test]
    fn prime_reports_shift_and_adopts_time() {
        let mut clock = ClockState::new(17, 10);
        assert_eq!(clock.prime(5_000), 5_000);
        assert_eq!(clock.sim_time(), 5_000);
        assert_eq!(clock.last_frame(), Some(5_000));
    }

    #[test]
    fn ticks_consume_whole_steps() {
        let mut clock = ClockState::new(17, 10);
        clock.prime(0);
        clock.observe(40);
        assert!(clock.take_tick());
        assert!(clock.take_tick());
        assert!(!clock.take_tick());
        assert_eq!(clock.sim_time(), 34);
        assert_eq!(clock.accumulator(), 6);
    }

    #[test]
    fn backlog_is_capped() {
        let mut clock = ClockState::new(17, 10);
        clock.prime(0);
        clock.observe(60_000);
        assert_eq!(clock.accumulator(), 170);
    }

    #[test]
    fn backwards_clock_adds_nothing() {
        let mut clock = ClockState::new(17, 10);
        clock.prime(1_000);
        assert_eq!(clock.observe(900), 0);
        assert_eq!(clock.accumulator(), 0);
    }

    #[test]
    fn zero_parameters_are_raised() {
        let clock = ClockState::new(0, 0);
        assert_eq!(clock.tick_step(), 1);
        assert_eq!(clock.max_catchup(), 1);
    }
}
