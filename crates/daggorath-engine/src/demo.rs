//! A small dungeon that exercises every scheduler slot and presentation hook.
//!
//! It is not the full game. The player walks a 32 by 32 grid, creatures
//! wake on a timer and wear the player down, the heart beats faster as
//! damage grows, and the torch dims. That is enough to drive the turn and
//! step animations, fainting, death, the intermission, victory and the
//! menu from real task fires.
//!
//! # Commands
//!
//! Typed in player mode and entered with Return. The first letter picks the
//! verb, the next letter the direction: `TL`, `TR`, `TA` turn; `M`, `MB`,
//! `ML`, `MR` step; `C` climbs. Escape opens the menu.

use std::collections::VecDeque;
use std::sync::Arc;

use daggorath_core::channel::{ChannelSync, WaitMode, WaitOutcome};
use daggorath_core::scheduler::{TaskDispatcher, TaskOutcome};
use daggorath_core::task::{TaskTable, clamp_period};
use daggorath_presentation::{Audio, Gameplay};
use daggorath_types::{
    ChannelId, Cheats, Clip, Key, LoopCount, MoveDirection, PostFadeAction, Request, TaskId,
    TurnDirection,
};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace, warn};

use crate::mixer::HeadlessMixer;

/// Grid edge length.
pub const GRID_SIZE: u8 = 32;

/// Level on which climbing ends in the intermission.
pub const INTERMISSION_LEVEL: u8 = 2;

/// Level on which climbing wins the game.
pub const FINAL_LEVEL: u8 = 5;

/// Simulated milliseconds between scripted demo commands.
pub const DEMO_STEP_MS: u64 = 1_200;

/// Creatures a level can hold at once.
pub const MAX_CREATURES: u8 = 8;

/// Damage dealt by one creature attack.
pub const ATTACK_DAMAGE: u16 = 9;

/// Creature moves between attacks.
const MOVES_PER_ATTACK: u32 = 3;

/// Life of a fresh torch, in torch task fires.
const TORCH_LIFE: u16 = 120;

/// Brightest light level the torch gives.
const MAX_LIGHT: u8 = 12;

/// Compass heading.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Facing {
    /// Up the grid.
    #[default]
    North,
    /// Right.
    East,
    /// Down.
    South,
    /// Left.
    West,
}

impl Facing {
    /// Heading after turning.
    pub const fn turned(self, direction: TurnDirection) -> Self {
        match (direction, self) {
            (TurnDirection::Left, Self::North) | (TurnDirection::Around, Self::East) => Self::West,
            (TurnDirection::Left, Self::East) | (TurnDirection::Around, Self::South) => Self::North,
            (TurnDirection::Left, Self::South) | (TurnDirection::Around, Self::West) => Self::East,
            (TurnDirection::Left, Self::West) | (TurnDirection::Around, Self::North) => Self::South,
            (TurnDirection::Right, Self::North) => Self::East,
            (TurnDirection::Right, Self::East) => Self::South,
            (TurnDirection::Right, Self::South) => Self::West,
            (TurnDirection::Right, Self::West) => Self::North,
        }
    }

    /// Heading of a step taken in `direction` relative to this facing.
    pub const fn step_heading(self, direction: MoveDirection) -> Self {
        match direction {
            MoveDirection::Forward => self,
            MoveDirection::Back => self.turned(TurnDirection::Around),
            MoveDirection::Left => self.turned(TurnDirection::Left),
            MoveDirection::Right => self.turned(TurnDirection::Right),
        }
    }
}

/// Everything a saved game holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DungeonState {
    /// Current level, from 1.
    pub level: u8,
    /// Grid row.
    pub row: u8,
    /// Grid column.
    pub col: u8,
    /// Heading.
    pub facing: Facing,
    /// Damage the player can take before dying.
    pub power: u16,
    /// Damage taken.
    pub damage: u16,
    /// Remaining torch life.
    pub torch: u16,
    /// Whether the player is passed out.
    pub fainted: bool,
    /// Creatures awake on this level.
    pub creatures: u8,
    /// Steps taken.
    pub moves: u32,
}

impl Default for DungeonState {
    fn default() -> Self {
        Self {
            level: 1,
            row: GRID_SIZE / 2,
            col: GRID_SIZE / 2,
            facing: Facing::North,
            power: 160,
            damage: 0,
            torch: TORCH_LIFE,
            fainted: false,
            creatures: 0,
            moves: 0,
        }
    }
}

impl DungeonState {
    /// Light level the torch currently gives.
    pub fn light(&self) -> u8 {
        u8::try_from(self.torch.div_ceil(10)).map_or(MAX_LIGHT, |l| l.min(MAX_LIGHT))
    }

    /// Move one square, stopping at the grid edge.
    pub fn step(&mut self, heading: Facing) {
        let last = GRID_SIZE.saturating_sub(1);
        match heading {
            Facing::North => self.row = self.row.saturating_sub(1),
            Facing::South => self.row = self.row.saturating_add(1).min(last),
            Facing::West => self.col = self.col.saturating_sub(1),
            Facing::East => self.col = self.col.saturating_add(1).min(last),
        }
        self.moves = self.moves.saturating_add(1);
    }

    /// Whether damage has reached the fainting point.
    pub fn faint_threshold_reached(&self) -> bool {
        u32::from(self.damage).saturating_mul(4) >= u32::from(self.power).saturating_mul(3)
    }

    /// Whether damage is low enough to come round.
    pub fn can_recover(&self) -> bool {
        u32::from(self.damage).saturating_mul(2) < u32::from(self.power)
    }
}

/// Game state shared with the save store.
pub type SharedDungeon = Arc<Mutex<DungeonState>>;

/// A player or demo command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Turn in place.
    Turn(TurnDirection),
    /// Take a step.
    Move(MoveDirection),
    /// Climb to the next level.
    Climb,
}

/// The autoplay sequence.
pub const DEMO_SCRIPT: [Command; 14] = [
    Command::Turn(TurnDirection::Left),
    Command::Move(MoveDirection::Forward),
    Command::Move(MoveDirection::Forward),
    Command::Turn(TurnDirection::Right),
    Command::Move(MoveDirection::Forward),
    Command::Move(MoveDirection::Left),
    Command::Turn(TurnDirection::Around),
    Command::Move(MoveDirection::Forward),
    Command::Move(MoveDirection::Back),
    Command::Climb,
    Command::Turn(TurnDirection::Right),
    Command::Move(MoveDirection::Forward),
    Command::Move(MoveDirection::Right),
    Command::Move(MoveDirection::Forward),
];

/// Parse a typed command line.
pub fn parse_command(line: &str) -> Option<Command> {
    let mut words = line.split_whitespace();
    let first = words.next()?;
    let mut letters = first.chars();
    let verb = letters.next()?.to_ascii_uppercase();
    let arg = match words.next() {
        Some(word) => word.chars().next(),
        None if first.len() <= 2 => letters.next(),
        None => None,
    }
    .map(|c| c.to_ascii_uppercase());
    match verb {
        'T' => {
            let direction = match arg? {
                'L' => TurnDirection::Left,
                'R' => TurnDirection::Right,
                'A' => TurnDirection::Around,
                _ => return None,
            };
            Some(Command::Turn(direction))
        }
        'M' => {
            let direction = match arg {
                None | Some('F') => MoveDirection::Forward,
                Some('B') => MoveDirection::Back,
                Some('L') => MoveDirection::Left,
                Some('R') => MoveDirection::Right,
                Some(_) => return None,
            };
            Some(Command::Move(direction))
        }
        'C' => Some(Command::Climb),
        _ => None,
    }
}

/// Heartbeat sounds on their own mixer channel.
#[derive(Debug)]
struct Heart {
    mixer: HeadlessMixer,
    channel: ChannelId,
    sync: ChannelSync,
    ticks: u32,
    beats: u32,
    heard: u32,
    muted: bool,
}

impl Heart {
    /// Clock fires between beats for the given damage and power.
    fn interval(damage: u16, power: u16) -> u32 {
        let power = u32::from(power.max(1));
        let damage = u32::from(damage).min(power);
        let quicken = damage.saturating_mul(50).checked_div(power).unwrap_or(0);
        60_u32.saturating_sub(quicken).max(10)
    }

    fn tick(&mut self, state: &DungeonState) {
        self.ticks = self.ticks.saturating_add(1);
        if self.ticks < Self::interval(state.damage, state.power) {
            return;
        }
        self.ticks = 0;
        if let Ok(WaitOutcome::Completed) =
            self.sync
                .wait_for_channel(self.channel, || true, WaitMode::NonBlocking)
        {
            self.heard = self.heard.saturating_add(1);
        }
        let clip = if state.can_recover() {
            Clip::HeartSlow
        } else {
            Clip::HeartFast
        };
        match self.mixer.play_on_channel(self.channel, clip, LoopCount::Once) {
            Ok(()) => self.beats = self.beats.saturating_add(1),
            Err(e) => {
                if !self.muted {
                    warn!(error = %e, "Heartbeat silenced");
                    self.muted = true;
                }
            }
        }
    }
}

/// The demo dungeon.
#[derive(Debug)]
pub struct DemoGame {
    state: SharedDungeon,
    heart: Heart,
    requests: VecDeque<Request>,
    keys: VecDeque<Key>,
    line: String,
    autoplay: bool,
    script_pos: usize,
    script_next: Option<u64>,
    script_done: bool,
    creature_speed: i32,
    creature_move_ms: i64,
    spawn_pending: u8,
    creature_moves: u32,
    cheats: Cheats,
    recovering: bool,
    death_requested: bool,
    dirty: bool,
}

impl DemoGame {
    /// A game sharing `state` with the save store and beating its heart on
    /// `heart_channel`.
    pub fn new(
        state: SharedDungeon,
        mixer: HeadlessMixer,
        heart_channel: ChannelId,
        sync: ChannelSync,
        creature_move_ms: i64,
    ) -> Self {
        Self {
            state,
            heart: Heart {
                mixer,
                channel: heart_channel,
                sync,
                ticks: 0,
                beats: 0,
                heard: 0,
                muted: false,
            },
            requests: VecDeque::new(),
            keys: VecDeque::new(),
            line: String::new(),
            autoplay: true,
            script_pos: 0,
            script_next: None,
            script_done: false,
            creature_speed: 100,
            creature_move_ms,
            spawn_pending: 0,
            creature_moves: 0,
            cheats: Cheats::default(),
            recovering: false,
            death_requested: false,
            dirty: false,
        }
    }

    /// Queue keys typed while playing.
    pub fn queue_keys(&mut self, keys: &[Key]) {
        self.keys.extend(keys.iter().copied());
    }

    /// Apply the current cheat settings.
    pub const fn set_cheats(&mut self, cheats: Cheats) {
        self.cheats = cheats;
    }

    /// Copy of the current state.
    pub fn snapshot(&self) -> DungeonState {
        self.state.lock().clone()
    }

    /// Heartbeats played so far.
    pub const fn heartbeats(&self) -> u32 {
        self.heart.beats
    }

    /// Creature movement period at the current speed setting.
    fn creature_period(&self) -> u64 {
        let speed = i64::from(self.creature_speed.max(1));
        let scaled = self
            .creature_move_ms
            .saturating_mul(100)
            .checked_div(speed)
            .unwrap_or(self.creature_move_ms);
        clamp_period(scaled)
    }

    fn spawn_creatures(&mut self, tasks: &mut TaskTable, now: u64) {
        while self.spawn_pending > 0 {
            if self.state.lock().creatures >= MAX_CREATURES {
                self.spawn_pending = 0;
                break;
            }
            let Some(id) = tasks.allocate_creature_slot() else {
                warn!("No free creature slot");
                self.spawn_pending = 0;
                break;
            };
            let period = self.creature_period();
            tasks.arm(id, period, now.saturating_add(period));
            self.spawn_pending = self.spawn_pending.saturating_sub(1);
            let mut state = self.state.lock();
            state.creatures = state.creatures.saturating_add(1);
            debug!(slot = %id, period_ms = period, level = state.level, "Creature awake");
        }
    }

    fn creature_move(&mut self, id: TaskId, tasks: &mut TaskTable) {
        let period = self.creature_period();
        if let Some(block) = tasks.get_mut(id) {
            if block.period_ms() != period {
                block.set_period(period);
            }
        }
        if self.death_requested {
            return;
        }
        self.creature_moves = self.creature_moves.saturating_add(1);
        if self.creature_moves % MOVES_PER_ATTACK != 0 {
            return;
        }
        let mut state = self.state.lock();
        if !self.cheats.invulnerable {
            state.damage = state.damage.saturating_add(ATTACK_DAMAGE);
        }
        trace!(slot = %id, damage = state.damage, power = state.power, "Creature attacks");
        let lethal = state.damage > state.power;
        if state.fainted {
            if lethal {
                info!(damage = state.damage, "Creature finishes the player");
                self.death_requested = true;
                self.requests.push_back(Request::DeathFade);
            }
        } else if state.faint_threshold_reached() {
            info!(damage = state.damage, power = state.power, "Player faints");
            state.fainted = true;
            self.requests.push_back(Request::Faint);
        }
    }

    fn heal(&mut self) {
        let mut state = self.state.lock();
        state.damage = state.damage.saturating_sub(1);
        if state.fainted && !self.recovering && !self.death_requested && state.can_recover() {
            self.recovering = true;
            self.requests.push_back(Request::Recover);
        }
    }

    fn burn_torch(&self) {
        if self.cheats.torch_always_lit {
            return;
        }
        let mut state = self.state.lock();
        state.torch = state.torch.saturating_sub(1);
    }

    fn player(&mut self, now: u64) -> TaskOutcome {
        if self.autoplay {
            return self.autoplay_step(now);
        }
        if self.state.lock().fainted {
            self.keys.clear();
            return TaskOutcome::Continue;
        }
        while let Some(key) = self.keys.pop_front() {
            match key {
                Key::Escape => {
                    self.line.clear();
                    self.requests.push_back(Request::Menu);
                    return TaskOutcome::Continue;
                }
                Key::Return => {
                    let line = std::mem::take(&mut self.line);
                    match parse_command(&line) {
                        Some(command) => self.execute(command),
                        None if line.trim().is_empty() => {}
                        None => debug!(line = %line, "Unknown command"),
                    }
                    return TaskOutcome::Continue;
                }
                Key::Backspace => {
                    self.line.pop();
                }
                Key::Space => self.line.push(' '),
                Key::Char(c) => self.line.push(c.to_ascii_uppercase()),
                _ => {}
            }
        }
        TaskOutcome::Continue
    }

    fn autoplay_step(&mut self, now: u64) -> TaskOutcome {
        let due = *self
            .script_next
            .get_or_insert(now.saturating_add(DEMO_STEP_MS));
        if now < due || self.script_done {
            return TaskOutcome::Continue;
        }
        self.script_next = Some(now.saturating_add(DEMO_STEP_MS));
        if let Some(command) = DEMO_SCRIPT.get(self.script_pos).copied() {
            self.script_pos = self.script_pos.saturating_add(1);
            debug!(step = self.script_pos, command = ?command, "Demo command");
            self.execute(command);
            return TaskOutcome::Continue;
        }
        info!("Demo script finished");
        self.script_done = true;
        TaskOutcome::CycleComplete
    }

    fn execute(&mut self, command: Command) {
        match command {
            Command::Turn(direction) => self.requests.push_back(Request::Turn { direction }),
            Command::Move(direction) if direction.is_animated() => {
                self.requests.push_back(Request::Move { direction });
            }
            Command::Move(direction) => {
                let mut state = self.state.lock();
                let heading = state.facing.step_heading(direction);
                state.step(heading);
                self.dirty = true;
            }
            Command::Climb => self.climb(),
        }
    }

    fn climb(&mut self) {
        let level = self.state.lock().level;
        if level >= FINAL_LEVEL {
            info!(level, "Climbed out of the dungeon");
            self.requests.push_back(Request::IntermissionFade {
                post_action: PostFadeAction::Victory,
            });
        } else if level == INTERMISSION_LEVEL {
            self.requests.push_back(Request::IntermissionFade {
                post_action: PostFadeAction::Level3Setup,
            });
        } else {
            self.state.lock().level = level.saturating_add(1);
            self.new_level();
            self.dirty = true;
        }
    }
}

impl TaskDispatcher for DemoGame {
    fn fire(&mut self, id: TaskId, tasks: &mut TaskTable, now: u64) -> TaskOutcome {
        match id {
            TaskId::CLOCK => {
                self.spawn_creatures(tasks, now);
                let state = self.state.lock().clone();
                self.heart.tick(&state);
                TaskOutcome::Continue
            }
            TaskId::PLAYER => self.player(now),
            TaskId::REFRESH_DISPLAY => {
                if std::mem::take(&mut self.dirty) {
                    let state = self.state.lock();
                    trace!(
                        level = state.level,
                        row = state.row,
                        col = state.col,
                        facing = ?state.facing,
                        "View refreshed"
                    );
                }
                TaskOutcome::Continue
            }
            TaskId::HEART_SLOW => {
                self.heal();
                TaskOutcome::Continue
            }
            TaskId::TORCH_BURN => {
                self.burn_torch();
                TaskOutcome::Continue
            }
            TaskId::CREATURE_REGEN => {
                self.spawn_pending = self.spawn_pending.saturating_add(1);
                self.spawn_creatures(tasks, now);
                TaskOutcome::Continue
            }
            id if id.is_creature_move() => {
                self.creature_move(id, tasks);
                TaskOutcome::Continue
            }
            id => {
                debug!(slot = %id, "No action for slot");
                TaskOutcome::Continue
            }
        }
    }
}

impl Gameplay for DemoGame {
    fn reset(&mut self) {
        *self.state.lock() = DungeonState::default();
        self.requests.clear();
        self.keys.clear();
        self.line.clear();
        self.script_pos = 0;
        self.script_next = None;
        self.script_done = false;
        self.spawn_pending = 0;
        self.creature_moves = 0;
        self.recovering = false;
        self.death_requested = false;
        debug!("Game reset");
    }

    fn set_initial_objects(&mut self, autoplay: bool) {
        self.autoplay = autoplay;
        let mut state = self.state.lock();
        state.power = if autoplay || self.cheats.mithril_items {
            160
        } else {
            200
        };
        state.torch = TORCH_LIFE;
        info!(autoplay, power = state.power, "Starting objects handed out");
    }

    fn new_level(&mut self) {
        let mut state = self.state.lock();
        state.creatures = 0;
        state.row = GRID_SIZE / 2;
        state.col = GRID_SIZE / 2;
        self.spawn_pending = state.level.saturating_add(1).min(MAX_CREATURES);
        info!(level = state.level, creatures = self.spawn_pending, "Level built");
    }

    fn init_view(&mut self) {
        self.dirty = true;
    }

    fn prompt(&mut self) {
        if !self.autoplay {
            info!("Command?");
        }
    }

    fn level_transition(&mut self, action: PostFadeAction) {
        if action == PostFadeAction::Level3Setup {
            self.state.lock().level = INTERMISSION_LEVEL.saturating_add(1);
            self.new_level();
        }
    }

    fn begin_turn(&mut self, direction: TurnDirection) {
        let mut state = self.state.lock();
        state.facing = state.facing.turned(direction);
    }

    fn end_turn(&mut self, direction: TurnDirection, completed: bool) {
        debug!(direction = ?direction, completed, "Turn finished");
        self.dirty = true;
    }

    fn begin_move(&mut self, direction: MoveDirection) {
        trace!(direction = ?direction, "Step starting");
    }

    fn step_move(&mut self, direction: MoveDirection) {
        let mut state = self.state.lock();
        let heading = state.facing.step_heading(direction);
        state.step(heading);
        self.dirty = true;
    }

    fn abort_move(&mut self, direction: MoveDirection) {
        debug!(direction = ?direction, "Step abandoned");
    }

    fn is_lethal(&self) -> bool {
        let state = self.state.lock();
        state.damage > state.power
    }

    fn base_light_level(&self) -> u8 {
        self.state.lock().light()
    }

    fn clear_faint(&mut self) {
        self.state.lock().fainted = false;
        self.recovering = false;
    }

    fn clear_input_buffer(&mut self) {
        self.keys.clear();
        self.line.clear();
    }

    fn update_creature_speed(&mut self, percent: i32) {
        self.creature_speed = percent.max(1);
        debug!(percent = self.creature_speed, "Creature speed changed");
    }

    fn take_request(&mut self) -> Option<Request> {
        self.requests.pop_front()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use daggorath_core::config::GameConfig;
    use daggorath_core::scheduler::Scheduler;

    use super::*;

    fn game() -> (DemoGame, HeadlessMixer) {
        let sync = ChannelSync::new(2, Duration::from_millis(10), Duration::from_millis(1));
        let mixer = HeadlessMixer::new(2, sync.notifier());
        let game = DemoGame::new(
            Arc::new(Mutex::new(DungeonState::default())),
            mixer.clone(),
            ChannelId(1),
            sync,
            1_000,
        );
        (game, mixer)
    }

    fn table() -> TaskTable {
        TaskTable::new(4)
    }

    #[test]
    fn commands_parse_with_or_without_spaces() {
        assert_eq!(parse_command("TL"), Some(Command::Turn(TurnDirection::Left)));
        assert_eq!(
            parse_command("TURN AROUND"),
            Some(Command::Turn(TurnDirection::Around))
        );
        assert_eq!(parse_command("m"), Some(Command::Move(MoveDirection::Forward)));
        assert_eq!(parse_command("MOVE"), Some(Command::Move(MoveDirection::Forward)));
        assert_eq!(parse_command("M B"), Some(Command::Move(MoveDirection::Back)));
        assert_eq!(parse_command("CLIMB"), Some(Command::Climb));
        assert_eq!(parse_command("T"), None);
        assert_eq!(parse_command("XYZZY"), None);
    }

    #[test]
    fn facing_turns_and_steps() {
        assert_eq!(Facing::North.turned(TurnDirection::Left), Facing::West);
        assert_eq!(Facing::West.turned(TurnDirection::Around), Facing::East);
        assert_eq!(Facing::East.step_heading(MoveDirection::Right), Facing::South);

        let mut state = DungeonState {
            row: 0,
            ..DungeonState::default()
        };
        state.step(Facing::North);
        assert_eq!(state.row, 0);
        assert_eq!(state.moves, 1);
    }

    #[test]
    fn typed_line_becomes_a_turn_request() {
        let (mut game, _) = game();
        game.set_initial_objects(false);
        game.queue_keys(&[Key::Char('t'), Key::Char('r'), Key::Return]);
        game.fire(TaskId::PLAYER, &mut table(), 0);
        assert_eq!(
            game.take_request(),
            Some(Request::Turn {
                direction: TurnDirection::Right
            })
        );
    }

    #[test]
    fn escape_asks_for_the_menu() {
        let (mut game, _) = game();
        game.set_initial_objects(false);
        game.queue_keys(&[Key::Char('m'), Key::Escape]);
        game.fire(TaskId::PLAYER, &mut table(), 0);
        assert_eq!(game.take_request(), Some(Request::Menu));
    }

    #[test]
    fn side_step_is_taken_at_once() {
        let (mut game, _) = game();
        game.set_initial_objects(false);
        game.queue_keys(&[Key::Char('m'), Key::Char('l'), Key::Return]);
        game.fire(TaskId::PLAYER, &mut table(), 0);
        assert_eq!(game.take_request(), None);
        assert_eq!(game.snapshot().col, 15);
    }

    #[test]
    fn new_level_wakes_creatures_on_the_next_clock() {
        let (mut game, _) = game();
        let mut tasks = table();
        game.new_level();
        game.fire(TaskId::CLOCK, &mut tasks, 100);
        assert_eq!(game.snapshot().creatures, 2);
        let first = tasks.get(TaskId::CREATURE_MOVE_BASE).unwrap();
        assert!(first.is_enabled());
        assert_eq!(first.period_ms(), 1_000);
        assert_eq!(first.next_fire(), 1_100);
    }

    #[test]
    fn creature_speed_rescales_move_period() {
        let (mut game, _) = game();
        let mut tasks = table();
        game.new_level();
        game.fire(TaskId::CLOCK, &mut tasks, 0);
        game.update_creature_speed(200);
        game.fire(TaskId::CREATURE_MOVE_BASE, &mut tasks, 1_000);
        assert_eq!(tasks.get(TaskId::CREATURE_MOVE_BASE).unwrap().period_ms(), 500);
    }

    #[test]
    fn attacks_cause_faint_then_death() {
        let (mut game, _) = game();
        let mut tasks = table();
        game.state.lock().damage = 117;
        for _ in 0..MOVES_PER_ATTACK {
            game.fire(TaskId::CREATURE_MOVE_BASE, &mut tasks, 0);
        }
        assert_eq!(game.take_request(), Some(Request::Faint));
        assert!(game.snapshot().fainted);
        assert!(!game.is_lethal());

        game.state.lock().damage = 155;
        for _ in 0..MOVES_PER_ATTACK {
            game.fire(TaskId::CREATURE_MOVE_BASE, &mut tasks, 0);
        }
        assert!(game.is_lethal());
        assert_eq!(game.take_request(), Some(Request::DeathFade));
    }

    #[test]
    fn invulnerable_cheat_ignores_attacks() {
        let (mut game, _) = game();
        let mut cheats = Cheats::default();
        cheats.invulnerable = true;
        game.set_cheats(cheats);
        for _ in 0..30 {
            game.fire(TaskId::CREATURE_MOVE_BASE, &mut table(), 0);
        }
        assert_eq!(game.snapshot().damage, 0);
    }

    #[test]
    fn healing_a_fainted_player_asks_to_recover_once() {
        let (mut game, _) = game();
        {
            let mut state = game.state.lock();
            state.fainted = true;
            state.damage = 70;
        }
        game.fire(TaskId::HEART_SLOW, &mut table(), 0);
        game.fire(TaskId::HEART_SLOW, &mut table(), 0);
        assert_eq!(game.take_request(), Some(Request::Recover));
        assert_eq!(game.take_request(), None);
        game.clear_faint();
        assert!(!game.snapshot().fainted);
    }

    #[test]
    fn climbing_the_second_level_starts_the_intermission() {
        let (mut game, _) = game();
        game.state.lock().level = INTERMISSION_LEVEL;
        game.execute(Command::Climb);
        assert_eq!(
            game.take_request(),
            Some(Request::IntermissionFade {
                post_action: PostFadeAction::Level3Setup
            })
        );
        game.level_transition(PostFadeAction::Level3Setup);
        assert_eq!(game.snapshot().level, 3);
    }

    #[test]
    fn demo_script_runs_then_completes_the_cycle() {
        let (mut game, _) = game();
        let mut tasks = table();
        let mut now = 0;
        let mut outcome = game.fire(TaskId::PLAYER, &mut tasks, now);
        let mut commands: u32 = 0;
        while outcome == TaskOutcome::Continue && now < 60_000 {
            now = now.saturating_add(DEMO_STEP_MS);
            outcome = game.fire(TaskId::PLAYER, &mut tasks, now);
            while game.take_request().is_some() {
                commands = commands.saturating_add(1);
            }
        }
        assert_eq!(outcome, TaskOutcome::CycleComplete);
        assert!(commands >= 8);
    }

    #[test]
    fn heart_beats_on_its_channel() {
        let (mut game, mixer) = game();
        let mut tasks = table();
        for _ in 0..60 {
            game.fire(TaskId::CLOCK, &mut tasks, 0);
        }
        assert_eq!(game.heartbeats(), 1);
        assert_eq!(mixer.playing(ChannelId(1)), Some(Clip::HeartSlow));
    }

    #[test]
    fn heart_quickens_with_damage() {
        assert_eq!(Heart::interval(0, 160), 60);
        assert_eq!(Heart::interval(160, 160), 10);
        assert!(Heart::interval(80, 160) < 60);
    }

    #[test]
    fn torch_dims_the_base_light() {
        let (mut game, _) = game();
        assert_eq!(game.base_light_level(), 12);
        game.state.lock().torch = 35;
        assert_eq!(game.base_light_level(), 4);
        game.fire(TaskId::TORCH_BURN, &mut table(), 0);
        assert_eq!(game.snapshot().torch, 34);
    }

    #[test]
    fn game_drives_a_real_scheduler() {
        let config = GameConfig::default();
        let mut scheduler = Scheduler::new(&config);
        let (mut game, _) = game();
        game.new_level();
        scheduler.advance_and_fire(0, &mut game);
        let report = scheduler.advance_and_fire(100, &mut game);
        assert!(report.fired > 0);
        assert_eq!(game.snapshot().creatures, 2);
    }
}
