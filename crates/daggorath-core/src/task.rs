//! Task control blocks and the fixed-capacity table that holds them.
//!
//! A [`TaskControlBlock`] is one periodic unit of work: a period, the
//! absolute simulated time it next fires at, and an enabled flag. The action
//! itself is not stored here; the scheduler hands the block's [`TaskId`] to a
//! [`TaskDispatcher`](crate::scheduler::TaskDispatcher) which owns the
//! behavior.
//!
//! # Invariants
//!
//! - After firing, `next_fire` advances by exactly `period`, never to
//!   `now + period`, so late ticks do not accumulate drift.
//! - The table is sized once at construction and never grows or shrinks.

use daggorath_types::TaskId;
use serde::{Deserialize, Serialize};

use crate::config::TimingConfig;

/// Which advances may fire a block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskClass {
    /// Gameplay timers that keep running during animations.
    Timer,
    /// Input and display work that only runs during normal play.
    Interactive,
}

/// One scheduled unit of work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskControlBlock {
    id: TaskId,
    class: TaskClass,
    period_ms: u64,
    next_fire: u64,
    enabled: bool,
}

impl TaskControlBlock {
    /// A disabled block in slot `id`.
    pub const fn new(id: TaskId, class: TaskClass) -> Self {
        Self {
            id,
            class,
            period_ms: 0,
            next_fire: 0,
            enabled: false,
        }
    }

    /// Slot identity.
    pub const fn id(&self) -> TaskId {
        self.id
    }

    /// Firing class.
    pub const fn class(&self) -> TaskClass {
        self.class
    }

    /// Period in milliseconds; zero while disabled.
    pub const fn period_ms(&self) -> u64 {
        self.period_ms
    }

    /// Absolute simulated time of the next fire.
    pub const fn next_fire(&self) -> u64 {
        self.next_fire
    }

    /// Whether the block participates in scheduling.
    pub const fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Enable the block with `period_ms`, first firing at `first_fire`.
    ///
    /// A zero period disables the block instead.
    pub const fn arm(&mut self, period_ms: u64, first_fire: u64) {
        if period_ms == 0 {
            self.disable();
            return;
        }
        self.period_ms = period_ms;
        self.next_fire = first_fire;
        self.enabled = true;
    }

    /// Stop scheduling the block.
    pub const fn disable(&mut self) {
        self.period_ms = 0;
        self.enabled = false;
    }

    /// Replace the period without moving the pending fire time.
    ///
    /// The new period is used from the next re-arm onward.
    pub const fn set_period(&mut self, period_ms: u64) {
        if period_ms == 0 {
            self.disable();
        } else {
            self.period_ms = period_ms;
        }
    }

    /// True when the block is enabled and due at simulated time `sim`.
    pub const fn is_due(&self, sim: u64) -> bool {
        self.enabled && self.next_fire <= sim
    }

    /// Advance `next_fire` by exactly one period.
    pub const fn rearm(&mut self) {
        self.next_fire = self.next_fire.saturating_add(self.period_ms);
    }

    /// Advance `next_fire` past `sim` in whole periods, keeping its phase.
    ///
    /// Returns how many fires were skipped.
    pub fn skip_missed(&mut self, sim: u64) -> u64 {
        if !self.enabled || self.next_fire > sim {
            return 0;
        }
        let behind = sim.saturating_sub(self.next_fire);
        let missed = behind
            .checked_div(self.period_ms)
            .unwrap_or(0)
            .saturating_add(1);
        self.next_fire = self
            .next_fire
            .saturating_add(missed.saturating_mul(self.period_ms));
        missed
    }

    /// Move the pending fire time forward by `delta` milliseconds.
    pub const fn shift(&mut self, delta: u64) {
        self.next_fire = self.next_fire.saturating_add(delta);
    }
}

/// Startup configuration of one block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BaselineEntry {
    /// Slot to configure.
    pub id: TaskId,
    /// Firing class.
    pub class: TaskClass,
    /// Period in milliseconds; zero or negative leaves the block disabled.
    pub period_ms: i64,
    /// Delay from installation to the first fire.
    pub phase_ms: u64,
}

/// The startup state of every block, installed at game start and on every
/// full reset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Baseline {
    entries: Vec<BaselineEntry>,
    creature_slots: u8,
}

/// Milliseconds per minute, used for the creature regeneration period.
pub const MS_PER_MINUTE: i64 = 60_000;

impl Baseline {
    /// Build the baseline from timing configuration and the user's creature
    /// regeneration interval.
    ///
    /// The clock, player and display tasks fire on the first tick; the slower
    /// timers wait one full period. Creature movement slots start disabled
    /// and are armed by gameplay.
    pub fn from_config(timing: &TimingConfig, creature_regen_minutes: u32) -> Self {
        let regen = i64::from(creature_regen_minutes).saturating_mul(MS_PER_MINUTE);
        let entries = vec![
            entry(TaskId::CLOCK, TaskClass::Timer, timing.clock_ms, false),
            entry(TaskId::PLAYER, TaskClass::Interactive, timing.player_ms, false),
            entry(
                TaskId::REFRESH_DISPLAY,
                TaskClass::Interactive,
                timing.refresh_display_ms,
                false,
            ),
            entry(TaskId::HEART_SLOW, TaskClass::Timer, timing.heart_slow_ms, true),
            entry(TaskId::TORCH_BURN, TaskClass::Timer, timing.torch_burn_ms, true),
            entry(TaskId::CREATURE_REGEN, TaskClass::Timer, regen, true),
        ];
        Self {
            entries,
            creature_slots: timing.creature_slots,
        }
    }

    /// Entries for the fixed blocks, in table order.
    pub fn entries(&self) -> &[BaselineEntry] {
        &self.entries
    }

    /// Number of creature movement slots after the fixed blocks.
    pub const fn creature_slots(&self) -> u8 {
        self.creature_slots
    }

    /// Total table capacity.
    pub fn capacity(&self) -> usize {
        TaskId::FIXED_COUNT.saturating_add(usize::from(self.creature_slots))
    }

    /// Replace the creature regeneration period.
    pub fn set_creature_regen_minutes(&mut self, minutes: u32) {
        let regen = i64::from(minutes).saturating_mul(MS_PER_MINUTE);
        for e in &mut self.entries {
            if e.id == TaskId::CREATURE_REGEN {
                e.period_ms = regen;
                e.phase_ms = clamp_period(regen);
            }
        }
    }
}

fn entry(id: TaskId, class: TaskClass, period_ms: i64, delayed: bool) -> BaselineEntry {
    BaselineEntry {
        id,
        class,
        period_ms,
        phase_ms: if delayed { clamp_period(period_ms) } else { 0 },
    }
}

/// Convert a configured period into table form; non-positive means disabled.
pub fn clamp_period(period_ms: i64) -> u64 {
    u64::try_from(period_ms).unwrap_or(0)
}

/// Fixed-capacity, priority-ordered collection of task control blocks.
///
/// Slot order is firing order: lower ids fire first within a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTable {
    blocks: Vec<TaskControlBlock>,
    next_creature: usize,
}

impl TaskTable {
    /// Allocate a table with `creature_slots` movement slots, all disabled.
    pub fn new(creature_slots: u8) -> Self {
        let capacity = TaskId::FIXED_COUNT.saturating_add(usize::from(creature_slots));
        let blocks = (0..capacity)
            .filter_map(|i| u8::try_from(i).ok())
            .map(|raw| {
                let id = TaskId(raw);
                let class = if id == TaskId::PLAYER || id == TaskId::REFRESH_DISPLAY {
                    TaskClass::Interactive
                } else {
                    TaskClass::Timer
                };
                TaskControlBlock::new(id, class)
            })
            .collect();
        Self {
            blocks,
            next_creature: TaskId::FIXED_COUNT,
        }
    }

    /// Reset every block to `baseline`, scheduling first fires relative to `now`.
    ///
    /// Idempotent: installing the same baseline at the same time twice gives
    /// the same table.
    pub fn install(&mut self, baseline: &Baseline, now: u64) {
        for block in &mut self.blocks {
            block.disable();
            block.next_fire = 0;
        }
        for e in baseline.entries() {
            if let Some(block) = self.blocks.get_mut(e.id.index()) {
                block.class = e.class;
                block.arm(clamp_period(e.period_ms), now.saturating_add(e.phase_ms));
            }
        }
        self.next_creature = TaskId::FIXED_COUNT;
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.blocks.len()
    }

    /// True when the table has no slots at all.
    pub fn is_empty(&self) -> bool {
        self.blocks.is_empty()
    }

    /// Block in slot `id`.
    pub fn get(&self, id: TaskId) -> Option<&TaskControlBlock> {
        self.blocks.get(id.index())
    }

    /// Mutable block in slot `id`.
    pub fn get_mut(&mut self, id: TaskId) -> Option<&mut TaskControlBlock> {
        self.blocks.get_mut(id.index())
    }

    /// Blocks in firing order.
    pub fn iter(&self) -> impl Iterator<Item = &TaskControlBlock> {
        self.blocks.iter()
    }

    /// Arm slot `id`. Returns false if the slot does not exist.
    pub fn arm(&mut self, id: TaskId, period_ms: u64, first_fire: u64) -> bool {
        let Some(block) = self.get_mut(id) else {
            return false;
        };
        block.arm(period_ms, first_fire);
        true
    }

    /// Disable slot `id`. Returns false if the slot does not exist.
    pub fn disable(&mut self, id: TaskId) -> bool {
        let Some(block) = self.get_mut(id) else {
            return false;
        };
        block.disable();
        true
    }

    /// Hand out the next unused creature movement slot.
    pub fn allocate_creature_slot(&mut self) -> Option<TaskId> {
        let index = self.next_creature;
        let block = self.blocks.get(index)?;
        let id = block.id();
        self.next_creature = index.saturating_add(1);
        Some(id)
    }

    /// Shift every enabled block forward by `delta` milliseconds.
    pub fn shift(&mut self, delta: u64) {
        for block in self.blocks.iter_mut().filter(|b| b.enabled) {
            block.shift(delta);
        }
    }

    pub(crate) fn slot_mut(&mut self, index: usize) -> Option<&mut TaskControlBlock> {
        self.blocks.get_mut(index)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn rearm_is_drift_free() {
        let mut block = TaskControlBlock::new(TaskId::CLOCK, TaskClass::Timer);
        block.arm(50, 1_000);
        for k in 0..20_u64 {
            // Fire late by a varying amount; the schedule must not notice.
            let late = k.wrapping_mul(7) % 17;
            assert!(block.is_due(1_000 + k * 50 + late));
            block.rearm();
            assert_eq!(block.next_fire(), 1_000 + (k + 1) * 50);
        }
    }

    #[test]
    fn zero_period_disables() {
        let mut block = TaskControlBlock::new(TaskId::TORCH_BURN, TaskClass::Timer);
        block.arm(0, 10);
        assert!(!block.is_enabled());
        assert!(!block.is_due(u64::MAX));
    }

    #[test]
    fn set_period_keeps_pending_fire() {
        let mut block = TaskControlBlock::new(TaskId::CREATURE_REGEN, TaskClass::Timer);
        block.arm(100, 500);
        block.set_period(30);
        assert_eq!(block.next_fire(), 500);
        block.rearm();
        assert_eq!(block.next_fire(), 530);
    }

    #[test]
    fn skip_missed_keeps_phase() {
        let mut block = TaskControlBlock::new(TaskId::PLAYER, TaskClass::Interactive);
        block.arm(17, 100);
        assert_eq!(block.skip_missed(150), 3);
        assert_eq!(block.next_fire(), 151);
        assert_eq!(block.skip_missed(150), 0);
    }

    #[test]
    fn table_has_fixed_capacity_and_classes() {
        let table = TaskTable::new(32);
        assert_eq!(table.len(), 38);
        assert_eq!(
            table.get(TaskId::PLAYER).unwrap().class(),
            TaskClass::Interactive
        );
        assert_eq!(table.get(TaskId::CLOCK).unwrap().class(), TaskClass::Timer);
        assert!(table.get(TaskId(38)).is_none());
    }

    #[test]
    fn install_is_idempotent() {
        let baseline = Baseline::from_config(&TimingConfig::default(), 5);
        let mut a = TaskTable::new(4);
        a.install(&baseline, 200);
        let snapshot = a.clone();
        a.install(&baseline, 200);
        assert_eq!(a, snapshot);
        assert_eq!(a.get(TaskId::CLOCK).unwrap().next_fire(), 200);
        assert_eq!(
            a.get(TaskId::CREATURE_REGEN).unwrap().next_fire(),
            200 + 300_000
        );
        assert!(!a.get(TaskId::CREATURE_MOVE_BASE).unwrap().is_enabled());
    }

    #[test]
    fn creature_slots_run_out() {
        let baseline = Baseline::from_config(&TimingConfig::default(), 5);
        let mut table = TaskTable::new(2);
        table.install(&baseline, 0);
        assert_eq!(table.allocate_creature_slot(), Some(TaskId(6)));
        assert_eq!(table.allocate_creature_slot(), Some(TaskId(7)));
        assert_eq!(table.allocate_creature_slot(), None);
        table.install(&baseline, 0);
        assert_eq!(table.allocate_creature_slot(), Some(TaskId(6)));
    }

    #[test]
    fn negative_baseline_period_leaves_block_disabled() {
        let timing = TimingConfig {
            torch_burn_ms: -5,
            ..TimingConfig::default()
        };
        let baseline = Baseline::from_config(&timing, 5);
        let mut table = TaskTable::new(0);
        table.install(&baseline, 0);
        assert!(!table.get(TaskId::TORCH_BURN).unwrap().is_enabled());
    }
}
