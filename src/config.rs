//! Application-level configuration loading.

use std::{env, fs, io::ErrorKind, path::PathBuf, time::Duration};

use chrono_tz::Tz;
use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the server looks for the JSON configuration.
const DEFAULT_CONFIG_PATH: &str = "config/app.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "PITWALL_CONFIG_PATH";
/// Default directory holding the store files and the commit log.
const DEFAULT_DATA_DIR: &str = "data";
/// How long a session with no explicit end counts as live, in minutes.
const DEFAULT_OPEN_ENDED_SESSION_MINUTES: i64 = 120;
/// Default bound on remote sync, in seconds.
const DEFAULT_SYNC_TIMEOUT_SECONDS: u64 = 10;

#[derive(Debug, Clone)]
/// Immutable runtime configuration shared across the application.
pub struct AppConfig {
    /// Directory holding the store files and the commit log.
    pub data_dir: PathBuf,
    /// Operator identities allowed through the access gate.
    pub allowed_operators: Vec<String>,
    /// Live window applied to sessions without an explicit end.
    pub open_ended_session_window: chrono::Duration,
    /// Timezone used for display when the caller does not pick one.
    pub display_timezone: Tz,
    /// Directory of the remote commit-log mirror, when syncing is wanted.
    pub remote_dir: Option<PathBuf>,
    /// Upper bound on one sync operation.
    pub sync_timeout: Duration,
}

impl AppConfig {
    /// Load the application configuration from disk, falling back to built-in
    /// defaults when the file is absent or unreadable.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(
                        path = %path.display(),
                        data_dir = %config.data_dir.display(),
                        operators = config.allowed_operators.len(),
                        "loaded configuration"
                    );
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
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            allowed_operators: Vec::new(),
            open_ended_session_window: chrono::Duration::minutes(
                DEFAULT_OPEN_ENDED_SESSION_MINUTES,
            ),
            display_timezone: chrono_tz::UTC,
            remote_dir: None,
            sync_timeout: Duration::from_secs(DEFAULT_SYNC_TIMEOUT_SECONDS),
        }
    }
}

#[derive(Debug, Deserialize)]
/// JSON representation of the configuration file located at [`DEFAULT_CONFIG_PATH`].
struct RawConfig {
    data_dir: Option<PathBuf>,
    #[serde(default)]
    allowed_operators: Vec<String>,
    open_ended_session_minutes: Option<i64>,
    display_timezone: Option<String>,
    remote_dir: Option<PathBuf>,
    sync_timeout_seconds: Option<u64>,
}

impl From<RawConfig> for AppConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = AppConfig::default();

        let display_timezone = match raw.display_timezone {
            Some(name) => match name.parse::<Tz>() {
                Ok(tz) => tz,
                Err(err) => {
                    warn!(%name, %err, "unknown display timezone in config; using UTC");
                    defaults.display_timezone
                }
            },
            None => defaults.display_timezone,
        };

        Self {
            data_dir: raw.data_dir.unwrap_or(defaults.data_dir),
            allowed_operators: raw.allowed_operators,
            open_ended_session_window: raw
                .open_ended_session_minutes
                .map(chrono::Duration::minutes)
                .unwrap_or(defaults.open_ended_session_window),
            display_timezone,
            remote_dir: raw.remote_dir,
            sync_timeout: raw
                .sync_timeout_seconds
                .map(Duration::from_secs)
                .unwrap_or(defaults.sync_timeout),
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
