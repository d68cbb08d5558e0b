//! Scheduler lifecycle tests driven through the public API with a dispatcher
//! that behaves like gameplay code: it arms creature slots, disables blocks
//! from inside actions, and reports a full cycle.

#![allow(clippy::unwrap_used)]

use daggorath_core::config::GameConfig;
use daggorath_core::scheduler::{Scheduler, TaskDispatcher, TaskOutcome};
use daggorath_core::task::TaskTable;
use daggorath_types::TaskId;

#[derive(Default)]
struct Game {
    clock_fires: u32,
    creature_moves: Vec<(TaskId, u64)>,
    torch_fires: u32,
}

impl TaskDispatcher for Game {
    fn fire(&mut self, id: TaskId, tasks: &mut TaskTable, now: u64) -> TaskOutcome {
        match id {
            TaskId::CLOCK => {
                self.clock_fires += 1;
                if self.clock_fires == 100 {
                    return TaskOutcome::CycleComplete;
                }
            }
            TaskId::TORCH_BURN => {
                self.torch_fires += 1;
                // A spent torch stops burning.
                tasks.disable(TaskId::TORCH_BURN);
            }
            other if other.is_creature_move() => self.creature_moves.push((other, now)),
            _ => {}
        }
        TaskOutcome::Continue
    }
}

fn run(sched: &mut Scheduler, game: &mut Game, from: u64, to: u64) -> bool {
    let mut cycle = false;
    let mut now = from;
    while now <= to {
        cycle |= sched.advance_and_fire(now, game).cycle_complete;
        now += 16;
    }
    cycle
}

#[test]
fn creature_slots_armed_by_gameplay_fire_on_their_period() {
    let config = GameConfig::default();
    let mut sched = Scheduler::new(&config);
    let mut game = Game::default();
    sched.advance_and_fire(1_000, &mut game);

    let slot = sched.allocate_creature_slot().unwrap();
    assert_eq!(slot, TaskId::CREATURE_MOVE_BASE);
    let period = u64::try_from(sched.creature_move_ms()).unwrap();
    let start = sched.sim_time();
    sched.tasks_mut().arm(slot, period, start + period);

    run(&mut sched, &mut game, 1_016, 4_600);
    let fire_times: Vec<u64> = game.creature_moves.iter().map(|(_, t)| *t).collect();
    assert_eq!(fire_times.len(), 3);
    for (k, t) in fire_times.iter().enumerate() {
        let due = start + period * (u64::try_from(k).unwrap() + 1);
        assert!(*t >= due && *t < due + 17, "fire {k} at {t}, due {due}");
    }
}

#[test]
fn actions_can_disable_their_own_block() {
    let mut sched = Scheduler::new(&GameConfig::default());
    let mut game = Game::default();
    sched.advance_and_fire(0, &mut game);
    run(&mut sched, &mut game, 16, 12_000);
    assert_eq!(game.torch_fires, 1);
    assert!(!sched.tasks().get(TaskId::TORCH_BURN).unwrap().is_enabled());
}

#[test]
fn reset_restores_baseline_after_gameplay_changes() {
    let mut sched = Scheduler::new(&GameConfig::default());
    let mut game = Game::default();
    sched.advance_and_fire(0, &mut game);
    run(&mut sched, &mut game, 16, 6_000);
    sched.allocate_creature_slot().unwrap();

    sched.install_baseline();
    let torch = sched.tasks().get(TaskId::TORCH_BURN).unwrap();
    assert!(torch.is_enabled());
    assert_eq!(torch.next_fire(), sched.sim_time() + 5_000);
    assert_eq!(
        sched.allocate_creature_slot().unwrap(),
        TaskId::CREATURE_MOVE_BASE
    );
}

#[test]
fn cycle_complete_surfaces_from_advance() {
    let mut sched = Scheduler::new(&GameConfig::default());
    let mut game = Game::default();
    sched.advance_and_fire(0, &mut game);
    assert!(run(&mut sched, &mut game, 16, 2_000));
}

#[test]
fn table_full_after_every_slot_is_taken() {
    let config = GameConfig::parse("timing:\n  creature_slots: 2\n").unwrap();
    let mut sched = Scheduler::new(&config);
    sched.allocate_creature_slot().unwrap();
    sched.allocate_creature_slot().unwrap();
    assert!(sched.allocate_creature_slot().is_err());
}
