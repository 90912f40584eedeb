//! Application-level configuration loading for session timing and retention.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "QUIZ_BLITZ_BACK_CONFIG_PATH";

const DEFAULT_COUNTDOWN_SECS: u64 = 3;
const DEFAULT_RESULTS_DELAY_SECS: u64 = 3;
const DEFAULT_LEADERBOARD_DELAY_SECS: u64 = 5;
const DEFAULT_SESSION_TTL_SECS: u64 = 7200;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    countdown: Duration,
    results_delay: Duration,
    leaderboard_delay: Duration,
    session_ttl: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to baked-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded session timing config");
                    config
                }
                Err(err) => {
                    warn!(
                        path = %path.display(),
                        error = %err,
                        "failed to parse config; falling back to defaults"
                    );
                    Self::default()
                }
            },
            Err(err) if err.kind() == ErrorKind::NotFound => {
                info!(
                    path = %path.display(),
                    "config file not found; using built-in defaults"
                );
                Self::default()
            }
            Err(err) => {
                warn!(
                    path = %path.display(),
                    error = %err,
                    "failed to read config; falling back to defaults"
                );
                Self::default()
            }
        }
    }

    /// Delay between the host starting the game and the first question.
    pub fn countdown(&self) -> Duration {
        self.countdown
    }

    /// Delay between a question closing and the leaderboard being shown.
    pub fn results_delay(&self) -> Duration {
        self.results_delay
    }

    /// Delay the leaderboard stays up before the next question (or game end).
    pub fn leaderboard_delay(&self) -> Duration {
        self.leaderboard_delay
    }

    /// Retention window for a session, refreshed on every successful write.
    pub fn session_ttl(&self) -> Duration {
        self.session_ttl
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            countdown: Duration::from_secs(DEFAULT_COUNTDOWN_SECS),
            results_delay: Duration::from_secs(DEFAULT_RESULTS_DELAY_SECS),
            leaderboard_delay: Duration::from_secs(DEFAULT_LEADERBOARD_DELAY_SECS),
            session_ttl: Duration::from_secs(DEFAULT_SESSION_TTL_SECS),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    countdown_secs: Option<u64>,
    results_delay_secs: Option<u64>,
    leaderboard_delay_secs: Option<u64>,
    session_ttl_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();
        Self {
            countdown: raw
                .countdown_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.countdown),
            results_delay: raw
                .results_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.results_delay),
            leaderboard_delay: raw
                .leaderboard_delay_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.leaderboard_delay),
            session_ttl: raw
                .session_ttl_secs
                .map(Duration::from_secs)
                .unwrap_or(defaults.session_ttl),
        }
    }
}

/// Resolve the configuration path taking the environment override into account.
fn resolve_config_path() -> PathBuf {
    env::var_os(CONFIG_PATH_ENV)
        .map(PathBuf::from)
        .filter(|path| !path.as_os_str().is_empty())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH))
}
