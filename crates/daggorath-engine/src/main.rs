//! Headless host for the Daggorath port.
//!
//! Wires the scheduler and the presentation state machine to a log-backed
//! view, a headless mixer, console input, YAML save files and a small demo
//! dungeon, then renders frames on a tokio interval until the player quits.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `DAGGORATH_CONFIG` or `daggorath.yaml`
//! 2. Initialize structured logging (tracing)
//! 3. Create channel signals and start the mixer
//! 4. Open the save store and restore saved options
//! 5. Build the game, scheduler and presentation
//! 6. Run the frame loop
//! 7. Log the result

mod demo;
mod error;
mod host;
mod input;
mod mixer;
mod saves;
mod view;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use daggorath_core::channel::ChannelSync;
use daggorath_core::config::{GameConfig, LoggingConfig};
use daggorath_core::scheduler::Scheduler;
use daggorath_presentation::{Audio, Gameplay, Presentation};
use daggorath_types::ChannelId;
use parking_lot::Mutex;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::demo::{DemoGame, DungeonState};
use crate::error::EngineError;
use crate::host::Host;
use crate::input::ConsoleInput;
use crate::mixer::HeadlessMixer;
use crate::saves::FileSaveStore;
use crate::view::TracingView;

/// Config file read when `DAGGORATH_CONFIG` is not set.
const DEFAULT_CONFIG_PATH: &str = "daggorath.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if configuration, logging or the save store cannot be
/// set up.
#[tokio::main]
async fn main() -> Result<(), EngineError> {
    // 1. Load configuration.
    let (config, config_path) = load_config()?;

    // 2. Initialize structured logging.
    init_logging(&config.logging)?;
    info!(
        config = %config_path.display(),
        tick_step_ms = config.timing.tick_step_ms,
        render_interval_ms = config.presentation.render_interval_ms,
        blocking_waits = config.host.blocking_waits,
        "daggorath-engine starting"
    );

    // 3. Channel signals and mixer.
    let channels = ChannelSync::from_config(&config.host);
    let mut audio = HeadlessMixer::new(config.host.channel_count, channels.notifier());
    let _reaper = audio.spawn_reaper(Duration::from_millis(config.host.channel_poll_ms));
    let heart = heart_channel(&config);
    info!(
        channels = config.host.channel_count,
        fade_channel = config.presentation.fade_channel,
        heart_channel = %heart,
        "Mixer started"
    );

    // 4. Save store and saved options.
    let dungeon = Arc::new(Mutex::new(DungeonState::default()));
    let saves = FileSaveStore::open(&config.host.save_dir, Arc::clone(&dungeon))?;
    let settings = match saves.load_options()? {
        Some(saved) => {
            info!("Saved options restored");
            saved
        }
        None => config.settings.clone(),
    };
    audio.set_master_volume(settings.volume);

    // 5. Game, scheduler and presentation. The scheduler baseline follows
    //    the restored settings.
    let session_config = GameConfig {
        settings: settings.clone(),
        ..config.clone()
    };
    let mut game = DemoGame::new(
        dungeon,
        audio.clone(),
        heart,
        channels.clone(),
        config.timing.creature_move_ms,
    );
    game.update_creature_speed(settings.creature_speed);
    game.set_cheats(settings.cheats);

    let mut host = Host {
        presentation: Presentation::new(&session_config),
        scheduler: Scheduler::new(&session_config),
        view: TracingView::new(0),
        audio,
        input: ConsoleInput::spawn_stdin(),
        game,
        saves,
        settings,
        channels,
    };
    info!(
        slots = host.scheduler.tasks().len(),
        "Session assembled, entering frame loop"
    );

    // 6. Frame loop.
    let report = host::run(
        &mut host,
        Duration::from_millis(config.presentation.render_interval_ms),
        config.host.frame_limit,
    )
    .await;

    // 7. Log results.
    let dungeon = host.game.snapshot();
    info!(
        frames_presented = host.view.presented(),
        last_frame = host.view.last_presented().unwrap_or("none"),
        heartbeats = host.game.heartbeats(),
        level = dungeon.level,
        damage = dungeon.damage,
        mode = ?host.mode(),
        "Final state"
    );
    info!(
        end_reason = ?report.end_reason,
        frames = report.frames,
        gameplay_frames = report.gameplay_frames,
        rounds = report.rounds,
        "daggorath-engine shutdown complete"
    );

    Ok(())
}

/// Load and validate configuration.
///
/// `DAGGORATH_CONFIG` names the file; otherwise `daggorath.yaml` in the
/// working directory is used, and defaults apply if it does not exist.
fn load_config() -> Result<(GameConfig, PathBuf), EngineError> {
    let path = std::env::var_os("DAGGORATH_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    let config = if path.exists() {
        GameConfig::from_file(&path)?
    } else {
        GameConfig::parse("")?
    };
    config.validate()?;
    Ok((config, path))
}

/// Install the tracing subscriber. `RUST_LOG` wins over the configured level.
fn init_logging(logging: &LoggingConfig) -> Result<(), EngineError> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    let installed = if logging.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };
    installed.map_err(|e| EngineError::Logging {
        message: e.to_string(),
    })
}

/// The channel after the fade channel, wrapping round.
fn heart_channel(config: &GameConfig) -> ChannelId {
    let next = usize::from(config.presentation.fade_channel)
        .saturating_add(1)
        .checked_rem(config.host.channel_count)
        .unwrap_or(0);
    ChannelId(u8::try_from(next).unwrap_or(0))
}
