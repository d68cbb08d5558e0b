//! The frame loop.
//!
//! [`Host`] owns the collaborators of one session and builds a
//! [`GameContext`] from them for every frame. [`run`] drives it from a tokio
//! interval until the player quits, the frame limit is hit, or the process
//! is interrupted.

use std::time::Duration;

use daggorath_core::channel::ChannelSync;
use daggorath_core::scheduler::Scheduler;
use daggorath_presentation::{FrameSummary, GameContext, Presentation, run_frame};
use daggorath_types::{GameMode, Settings};
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::demo::DemoGame;
use crate::input::ConsoleInput;
use crate::mixer::HeadlessMixer;
use crate::saves::FileSaveStore;
use crate::view::TracingView;

/// Why the frame loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EndReason {
    /// The player asked to quit.
    Quit,
    /// `host.frame_limit` frames were rendered.
    FrameLimit,
    /// The process received Ctrl-C.
    Interrupted,
}

/// Totals for one run of the frame loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunReport {
    /// Frames rendered.
    pub frames: u64,
    /// Frames in which gameplay ran.
    pub gameplay_frames: u64,
    /// Rounds that ended and restarted.
    pub rounds: u64,
    /// Why the loop stopped.
    pub end_reason: EndReason,
}

/// Everything one session needs, owned in one place.
#[derive(Debug)]
pub struct Host {
    /// Presentation state machine.
    pub presentation: Presentation,
    /// Task scheduler.
    pub scheduler: Scheduler,
    /// Log-backed view.
    pub view: TracingView,
    /// Headless mixer.
    pub audio: HeadlessMixer,
    /// Console input.
    pub input: ConsoleInput,
    /// The demo dungeon.
    pub game: DemoGame,
    /// Save files.
    pub saves: FileSaveStore,
    /// Live user settings.
    pub settings: Settings,
    /// Channel completion signals.
    pub channels: ChannelSync,
}

impl Host {
    /// Render one frame at host time `now` (milliseconds since start).
    pub fn frame(&mut self, now: u64) -> FrameSummary {
        let before = self.mode();
        let summary = {
            let mut ctx = GameContext {
                scheduler: &mut self.scheduler,
                view: &mut self.view,
                audio: &mut self.audio,
                input: &mut self.input,
                game: &mut self.game,
                saves: &mut self.saves,
                settings: &mut self.settings,
                channels: Some(&self.channels),
            };
            run_frame(&mut self.presentation, now, &mut ctx)
        };

        let keys = self.presentation.take_keys();
        if !keys.is_empty() {
            self.game.queue_keys(&keys);
        }
        self.game.set_cheats(self.settings.cheats);

        if summary.mode != before {
            debug!(from = ?before, to = ?summary.mode, now, "Mode changed");
        }
        summary
    }

    /// Current presentation mode.
    pub fn mode(&self) -> GameMode {
        self.presentation.mode()
    }

    /// Whether the player asked to quit.
    pub const fn quit_requested(&self) -> bool {
        self.presentation.quit_requested()
    }
}

/// Drive `host` every `interval` until it quits or `frame_limit` frames
/// have been rendered (0 means no limit).
pub async fn run(host: &mut Host, interval: Duration, frame_limit: u64) -> RunReport {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    let started = Instant::now();
    let mut frames: u64 = 0;
    let mut gameplay_frames: u64 = 0;
    let mut rounds: u64 = 0;

    let end_reason = loop {
        tokio::select! {
            _ = ticker.tick() => {}
            _ = &mut ctrl_c => break EndReason::Interrupted,
        }
        let now = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        let summary = host.frame(now);
        frames = frames.saturating_add(1);
        if summary.gameplay_ran {
            gameplay_frames = gameplay_frames.saturating_add(1);
        }
        if summary.round_finished {
            rounds = rounds.saturating_add(1);
            info!(rounds, autoplay = host.presentation.session().autoplay, "Round finished");
        }
        if host.quit_requested() {
            break EndReason::Quit;
        }
        if frame_limit > 0 && frames >= frame_limit {
            break EndReason::FrameLimit;
        }
    };

    RunReport {
        frames,
        gameplay_frames,
        rounds,
        end_reason,
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::path::PathBuf;
    use std::sync::Arc;

    use daggorath_core::config::GameConfig;
    use daggorath_types::{ChannelId, InputEvent, Key};
    use parking_lot::Mutex;
    use tokio::sync::mpsc;

    use super::*;
    use crate::demo::DungeonState;

    struct Fixture {
        host: Host,
        keys: mpsc::UnboundedSender<InputEvent>,
        dir: PathBuf,
        now: u64,
    }

    impl Drop for Fixture {
        fn drop(&mut self) {
            let _ = std::fs::remove_dir_all(&self.dir);
        }
    }

    impl Fixture {
        fn new(tag: &str) -> Self {
            let mut config = GameConfig::default();
            config.presentation.crash_timeout_ms = 500;
            let dir = std::env::temp_dir().join(format!(
                "daggorath-host-{tag}-{}",
                std::process::id()
            ));
            let channels = ChannelSync::from_config(&config.host);
            let audio = HeadlessMixer::new(config.host.channel_count, channels.notifier());
            let dungeon = Arc::new(Mutex::new(DungeonState::default()));
            let saves = FileSaveStore::open(&dir, Arc::clone(&dungeon)).unwrap();
            let game = DemoGame::new(
                dungeon,
                audio.clone(),
                ChannelId(1),
                channels.clone(),
                config.timing.creature_move_ms,
            );
            let (tx, rx) = mpsc::unbounded_channel();
            let host = Host {
                presentation: Presentation::new(&config),
                scheduler: Scheduler::new(&config),
                view: TracingView::new(0),
                audio,
                input: ConsoleInput::from_receiver(rx),
                game,
                saves,
                settings: config.settings,
                channels,
            };
            Self {
                host,
                keys: tx,
                dir,
                now: 0,
            }
        }

        fn type_line(&self, keys: &[Key]) {
            for key in keys {
                self.keys.send(InputEvent::key_down(*key)).unwrap();
            }
        }

        /// Run frames 16 ms apart until `mode` is reached; false if it never is
        /// within `budget_ms`.
        fn run_until(&mut self, mode: GameMode, budget_ms: u64) -> bool {
            let stop = self.now.saturating_add(budget_ms);
            while self.now < stop {
                self.now = self.now.saturating_add(16);
                self.host.frame(self.now);
                if self.host.mode() == mode {
                    return true;
                }
            }
            false
        }
    }

    #[test]
    fn untouched_title_reaches_the_demo() {
        let mut fx = Fixture::new("demo");
        assert!(fx.run_until(GameMode::Playing, 120_000));
        assert!(fx.host.presentation.session().autoplay);
        assert!(fx.host.view.presented() > 0);
    }

    #[test]
    fn key_in_demo_hands_over_to_the_player() {
        let mut fx = Fixture::new("handover");
        assert!(fx.run_until(GameMode::Playing, 120_000));
        fx.type_line(&[Key::Space]);
        assert!(fx.run_until(GameMode::RestartWait, 1_000));
        assert!(fx.run_until(GameMode::Playing, 10_000));
        assert!(!fx.host.presentation.session().autoplay);

        fx.type_line(&[Key::Char('t'), Key::Char('l'), Key::Return]);
        assert!(fx.run_until(GameMode::TurnAnimation, 1_000));
        assert!(fx.run_until(GameMode::Playing, 2_000));
    }

    #[test]
    fn escape_while_playing_opens_the_menu() {
        let mut fx = Fixture::new("menu");
        assert!(fx.run_until(GameMode::Playing, 120_000));
        fx.type_line(&[Key::Space]);
        assert!(fx.run_until(GameMode::RestartWait, 1_000));
        assert!(fx.run_until(GameMode::Playing, 10_000));

        fx.type_line(&[Key::Escape]);
        assert!(fx.run_until(GameMode::Menu, 1_000));
        assert!(fx.host.scheduler.is_paused());
        fx.type_line(&[Key::Escape]);
        assert!(fx.run_until(GameMode::Playing, 1_000));
    }

    #[tokio::test(start_paused = true)]
    async fn frame_limit_stops_the_loop() {
        let mut fx = Fixture::new("limit");
        let report = run(&mut fx.host, Duration::from_millis(16), 5).await;
        assert_eq!(report.frames, 5);
        assert_eq!(report.end_reason, EndReason::FrameLimit);
    }

    #[tokio::test(start_paused = true)]
    async fn quit_event_ends_the_loop() {
        let mut fx = Fixture::new("quit");
        fx.keys.send(InputEvent::quit()).unwrap();
        let report = run(&mut fx.host, Duration::from_millis(16), 1_000).await;
        assert_eq!(report.end_reason, EndReason::Quit);
        assert!(report.frames < 1_000);
    }
}
