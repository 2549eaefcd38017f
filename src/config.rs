//! Application-level configuration loading: hub buffering, refresh and SSE timings.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "HUNT_BOARD_CONFIG_PATH";

const DEFAULT_SUBSCRIBER_BUFFER: usize = 1;
const DEFAULT_REFRESH_TIMEOUT_MS: u64 = 2_000;
const DEFAULT_KEEP_ALIVE_SECS: u64 = 15;

#[derive(Debug, Clone, PartialEq, Eq)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Snapshots each SSE subscriber may have queued before frames are skipped.
    pub subscriber_buffer: usize,
    /// Upper bound for one leaderboard recomposition and publish.
    pub refresh_timeout: Duration,
    /// Interval between SSE keep-alive comments.
    pub keep_alive: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let app_config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        subscriber_buffer = app_config.subscriber_buffer,
                        refresh_timeout_ms = app_config.refresh_timeout.as_millis() as u64,
                        "loaded configuration"
                    );
                    app_config
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
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: DEFAULT_SUBSCRIBER_BUFFER,
            refresh_timeout: Duration::from_millis(DEFAULT_REFRESH_TIMEOUT_MS),
            keep_alive: Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
/// Missing keys keep their defaults.
struct RawConfig {
    subscriber_buffer: Option<usize>,
    refresh_timeout_ms: Option<u64>,
    keep_alive_secs: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(value: RawConfig) -> Self {
        Self {
            subscriber_buffer: value
                .subscriber_buffer
                .unwrap_or(DEFAULT_SUBSCRIBER_BUFFER)
                .max(1),
            refresh_timeout: Duration::from_millis(
                value
                    .refresh_timeout_ms
                    .unwrap_or(DEFAULT_REFRESH_TIMEOUT_MS),
            ),
            keep_alive: Duration::from_secs(
                value
                    .keep_alive_secs
                    .unwrap_or(DEFAULT_KEEP_ALIVE_SECS)
                    .max(1),
            ),
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults_for_missing_keys() {
        let raw: RawConfig = serde_json::from_str(r#"{"refresh_timeout_ms": 500}"#).unwrap();
        let config = AppConfig::from(raw);
        assert_eq!(config.refresh_timeout, Duration::from_millis(500));
        assert_eq!(config.subscriber_buffer, DEFAULT_SUBSCRIBER_BUFFER);
        assert_eq!(config.keep_alive, Duration::from_secs(DEFAULT_KEEP_ALIVE_SECS));
    }

    #[test]
    fn zero_buffer_is_raised_to_one() {
        let raw: RawConfig = serde_json::from_str(r#"{"subscriber_buffer": 0}"#).unwrap();
        assert_eq!(AppConfig::from(raw).subscriber_buffer, 1);
    }
}
