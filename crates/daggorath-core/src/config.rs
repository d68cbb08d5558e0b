//! Configuration loading and typed config structures.
//!
//! The host reads a single YAML file (`daggorath.yaml` by default). Every
//! field has a default, so an empty file or a file naming only a few keys
//! is valid. [`GameConfig::validate`] reports values the scheduler or the
//! presentation cannot run with.

use std::path::{Path, PathBuf};

use daggorath_types::Settings;
use serde::Deserialize;

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },

    /// A value parsed but cannot be used.
    #[error("invalid configuration: {reason}")]
    Invalid {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Scheduler tick and task periods.
    #[serde(default)]
    pub timing: TimingConfig,

    /// Presentation phase durations.
    #[serde(default)]
    pub presentation: PresentationConfig,

    /// Host capabilities.
    #[serde(default)]
    pub host: HostConfig,

    /// Initial user settings.
    #[serde(default)]
    pub settings: Settings,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file at the given path.
    ///
    /// `DAGGORATH_LOG` overrides `logging.level`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = if yaml.trim().is_empty() {
            Self::default()
        } else {
            serde_yml::from_str(yaml)?
        };
        config.logging.apply_env_overrides();
        Ok(config)
    }

    /// Check values that would stall the scheduler or the presentation.
    ///
    /// Non-positive task periods are not reported here: the scheduler
    /// disables those blocks on its own. A positive period shorter than one
    /// tick is rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad value.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.timing.tick_step_ms == 0 {
            return Err(invalid("timing.tick_step_ms must be at least 1"));
        }
        if self.timing.max_catchup_ticks == 0 {
            return Err(invalid("timing.max_catchup_ticks must be at least 1"));
        }
        let periods = [
            ("timing.clock_ms", self.timing.clock_ms),
            ("timing.player_ms", self.timing.player_ms),
            ("timing.refresh_display_ms", self.timing.refresh_display_ms),
            ("timing.heart_slow_ms", self.timing.heart_slow_ms),
            ("timing.torch_burn_ms", self.timing.torch_burn_ms),
            ("timing.creature_move_ms", self.timing.creature_move_ms),
        ];
        for (name, period) in periods {
            let Ok(period) = u64::try_from(period) else {
                continue;
            };
            if period > 0 && period < self.timing.tick_step_ms {
                return Err(ConfigError::Invalid {
                    reason: format!(
                        "{name} {period} is shorter than timing.tick_step_ms {}",
                        self.timing.tick_step_ms
                    ),
                });
            }
        }
        if self.presentation.render_interval_ms == 0 {
            return Err(invalid("presentation.render_interval_ms must be at least 1"));
        }
        if self.presentation.buzz_step_ms == 0 {
            return Err(invalid("presentation.buzz_step_ms must be at least 1"));
        }
        if self.presentation.light_step_limit == 0 {
            return Err(invalid("presentation.light_step_limit must be at least 1"));
        }
        if usize::from(self.presentation.fade_channel) >= self.host.channel_count {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "presentation.fade_channel {} is outside the {} configured channels",
                    self.presentation.fade_channel, self.host.channel_count
                ),
            });
        }
        if self.host.channel_poll_ms == 0 {
            return Err(invalid("host.channel_poll_ms must be at least 1"));
        }
        if self.settings.volume > daggorath_types::VOLUME_MAX {
            return Err(ConfigError::Invalid {
                reason: format!(
                    "settings.volume {} exceeds {}",
                    self.settings.volume,
                    daggorath_types::VOLUME_MAX
                ),
            });
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> ConfigError {
    ConfigError::Invalid {
        reason: reason.to_owned(),
    }
}

/// Scheduler configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TimingConfig {
    /// Length of one fixed tick in milliseconds.
    #[serde(default = "default_tick_step_ms")]
    pub tick_step_ms: u64,

    /// Maximum ticks consumed by one advance.
    #[serde(default = "default_max_catchup_ticks")]
    pub max_catchup_ticks: u32,

    /// Clock task period.
    #[serde(default = "default_fast_period_ms")]
    pub clock_ms: i64,

    /// Player task period.
    #[serde(default = "default_fast_period_ms")]
    pub player_ms: i64,

    /// Display refresh task period.
    #[serde(default = "default_refresh_display_ms")]
    pub refresh_display_ms: i64,

    /// Heart slow-down task period.
    #[serde(default = "default_heart_slow_ms")]
    pub heart_slow_ms: i64,

    /// Torch burn-down task period.
    #[serde(default = "default_torch_burn_ms")]
    pub torch_burn_ms: i64,

    /// Period gameplay uses when it arms a creature movement slot.
    #[serde(default = "default_creature_move_ms")]
    pub creature_move_ms: i64,

    /// Number of creature movement slots after the fixed blocks.
    #[serde(default = "default_creature_slots")]
    pub creature_slots: u8,
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            tick_step_ms: default_tick_step_ms(),
            max_catchup_ticks: default_max_catchup_ticks(),
            clock_ms: default_fast_period_ms(),
            player_ms: default_fast_period_ms(),
            refresh_display_ms: default_refresh_display_ms(),
            heart_slow_ms: default_heart_slow_ms(),
            torch_burn_ms: default_torch_burn_ms(),
            creature_move_ms: default_creature_move_ms(),
            creature_slots: default_creature_slots(),
        }
    }
}

/// Durations and limits of the presentation state machine.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct PresentationConfig {
    /// Minimum time between redraws.
    #[serde(default = "default_render_interval_ms")]
    pub render_interval_ms: u64,

    /// Interval between fade counter steps.
    #[serde(default = "default_buzz_step_ms")]
    pub buzz_step_ms: u64,

    /// How long begin and middle fades show their message.
    #[serde(default = "default_pause_ms")]
    pub message_pause_ms: u64,

    /// How long the "PREPARE!" screen holds.
    #[serde(default = "default_pause_ms")]
    pub prepare_pause_ms: u64,

    /// How long autoplay shows the level map.
    #[serde(default = "default_demo_map_pause_ms")]
    pub demo_map_pause_ms: u64,

    /// Pause after a restart.
    #[serde(default = "default_pause_ms")]
    pub restart_pause_ms: u64,

    /// Interval between faint and recover light steps.
    #[serde(default = "default_light_step_ms")]
    pub light_step_ms: u64,

    /// Maximum light steps before a faint or recover is forced to finish.
    #[serde(default = "default_light_step_limit")]
    pub light_step_limit: u16,

    /// Longest a crash phase waits for its sound to stop.
    #[serde(default = "default_crash_timeout_ms")]
    pub crash_timeout_ms: u64,

    /// How long autoplay holds the death or victory screen.
    #[serde(default = "default_demo_hold_ms")]
    pub demo_hold_ms: u64,

    /// Mixer channel used by the fade sounds.
    #[serde(default)]
    pub fade_channel: u8,

    /// Longest save name accepted by the text entry dialog.
    #[serde(default = "default_save_name_max_len")]
    pub save_name_max_len: usize,

    /// Most saved games listed by the load and delete dialogs.
    #[serde(default = "default_max_listed_saves")]
    pub max_listed_saves: usize,
}

impl Default for PresentationConfig {
    fn default() -> Self {
        Self {
            render_interval_ms: default_render_interval_ms(),
            buzz_step_ms: default_buzz_step_ms(),
            message_pause_ms: default_pause_ms(),
            prepare_pause_ms: default_pause_ms(),
            demo_map_pause_ms: default_demo_map_pause_ms(),
            restart_pause_ms: default_pause_ms(),
            light_step_ms: default_light_step_ms(),
            light_step_limit: default_light_step_limit(),
            crash_timeout_ms: default_crash_timeout_ms(),
            demo_hold_ms: default_demo_hold_ms(),
            fade_channel: 0,
            save_name_max_len: default_save_name_max_len(),
            max_listed_saves: default_max_listed_saves(),
        }
    }
}

/// What the embedding host allows.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct HostConfig {
    /// Whether the host tolerates blocking waits on audio completion.
    #[serde(default)]
    pub blocking_waits: bool,

    /// Number of mixer channels.
    #[serde(default = "default_channel_count")]
    pub channel_count: usize,

    /// Longest blocking channel wait.
    #[serde(default = "default_channel_wait_timeout_ms")]
    pub channel_wait_timeout_ms: u64,

    /// Interval at which a blocking wait services its pump.
    #[serde(default = "default_channel_poll_ms")]
    pub channel_poll_ms: u64,

    /// Stop after this many frames (0 = run until quit).
    #[serde(default)]
    pub frame_limit: u64,

    /// Directory holding saved games and the options file.
    #[serde(default = "default_save_dir")]
    pub save_dir: PathBuf,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            blocking_waits: false,
            channel_count: default_channel_count(),
            channel_wait_timeout_ms: default_channel_wait_timeout_ms(),
            channel_poll_ms: default_channel_poll_ms(),
            frame_limit: 0,
            save_dir: default_save_dir(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Emit one JSON object per event instead of plain text.
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

impl LoggingConfig {
    /// Apply environment variable overrides.
    ///
    /// - `DAGGORATH_LOG` overrides `level`
    pub fn apply_env_overrides(&mut self) {
        if let Ok(val) = std::env::var("DAGGORATH_LOG") {
            self.level = val;
        }
    }
}

// ---------------------------------------------------------------------------
// Default value functions (used by serde)
// ---------------------------------------------------------------------------

const fn default_tick_step_ms() -> u64 {
    17
}

const fn default_max_catchup_ticks() -> u32 {
    10
}

const fn default_fast_period_ms() -> i64 {
    17
}

const fn default_refresh_display_ms() -> i64 {
    300
}

const fn default_heart_slow_ms() -> i64 {
    1_000
}

const fn default_torch_burn_ms() -> i64 {
    5_000
}

const fn default_creature_move_ms() -> i64 {
    1_000
}

const fn default_creature_slots() -> u8 {
    32
}

fn default_save_dir() -> PathBuf {
    PathBuf::from("saves")
}

const fn default_render_interval_ms() -> u64 {
    16
}

const fn default_buzz_step_ms() -> u64 {
    300
}

const fn default_pause_ms() -> u64 {
    2_500
}

const fn default_demo_map_pause_ms() -> u64 {
    3_000
}

const fn default_light_step_ms() -> u64 {
    750
}

const fn default_light_step_limit() -> u16 {
    256
}

const fn default_crash_timeout_ms() -> u64 {
    4_000
}

const fn default_demo_hold_ms() -> u64 {
    5_000
}

const fn default_save_name_max_len() -> usize {
    15
}

const fn default_max_listed_saves() -> usize {
    10
}

const fn default_channel_count() -> usize {
    8
}

const fn default_channel_wait_timeout_ms() -> u64 {
    3_000
}

const fn default_channel_poll_ms() -> u64 {
    16
}

fn default_log_level() -> String {
    "info".to_owned()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_yaml_gives_defaults() {
        let config = GameConfig::parse("").unwrap();
        assert_eq!(config.timing.tick_step_ms, 17);
        assert_eq!(config.timing.max_catchup_ticks, 10);
        assert_eq!(config.timing.creature_slots, 32);
        assert_eq!(config.presentation.buzz_step_ms, 300);
        assert_eq!(config.presentation.light_step_limit, 256);
        assert_eq!(config.host.channel_count, 8);
        assert!(!config.host.blocking_waits);
        assert_eq!(config.settings.turn_delay_ms, 37);
        assert_eq!(config.host.save_dir, PathBuf::from("saves"));
        assert!(!config.logging.json);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn partial_sections_fill_defaults() {
        let yaml = "timing:\n  tick_step_ms: 20\npresentation:\n  prepare_pause_ms: 100\n";
        let config = GameConfig::parse(yaml).unwrap();
        assert_eq!(config.timing.tick_step_ms, 20);
        assert_eq!(config.timing.clock_ms, 17);
        assert_eq!(config.presentation.prepare_pause_ms, 100);
        assert_eq!(config.presentation.restart_pause_ms, 2_500);
    }

    #[test]
    fn malformed_yaml_is_a_yaml_error() {
        let err = GameConfig::parse("timing: [1, 2").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml { .. }));
    }

    #[test]
    fn zero_tick_step_is_invalid() {
        let config = GameConfig::parse("timing:\n  tick_step_ms: 0\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("tick_step_ms"));
    }

    #[test]
    fn period_shorter_than_a_tick_is_invalid() {
        let config = GameConfig::parse("timing:\n  tick_step_ms: 20\n").unwrap();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("timing.clock_ms"));

        let disabled =
            GameConfig::parse("timing:\n  tick_step_ms: 20\n  clock_ms: 0\n  player_ms: -1\n")
                .unwrap();
        assert!(disabled.validate().is_ok());
    }

    #[test]
    fn fade_channel_must_exist() {
        let config =
            GameConfig::parse("presentation:\n  fade_channel: 9\nhost:\n  channel_count: 4\n")
                .unwrap();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::Invalid { .. })
        ));
    }

    #[test]
    fn missing_file_is_io_error() {
        let err = GameConfig::from_file(Path::new("/nonexistent/daggorath.yaml")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
