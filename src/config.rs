//! Runtime configuration for the coordination layer.

use std::{env, fs, io::ErrorKind, path::PathBuf};

use serde::Deserialize;
use tracing::{info, warn};

/// Default location on disk where the library looks for the JSON
/// configuration.
const DEFAULT_CONFIG_PATH: &str = "config/matchplay.json";
/// Environment variable that overrides [`DEFAULT_CONFIG_PATH`].
const CONFIG_PATH_ENV: &str = "MATCHPLAY_CONFIG_PATH";

const DEFAULT_BOARD_SNAPSHOT_LIMIT: usize = 100;
const DEFAULT_MAX_MOVE_PAYLOAD_BYTES: usize = 16 * 1024;

/// Immutable runtime configuration shared across the coordination services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoordConfig {
    /// Maximum number of open challenges delivered per board snapshot.
    /// Older challenges win when the board is larger than this.
    pub board_snapshot_limit: usize,
    /// Upper bound on the serialized size of one move payload.
    pub max_move_payload_bytes: usize,
}

impl Default for CoordConfig {
    fn default() -> Self {
        Self {
            board_snapshot_limit: DEFAULT_BOARD_SNAPSHOT_LIMIT,
            max_move_payload_bytes: DEFAULT_MAX_MOVE_PAYLOAD_BYTES,
        }
    }
}

impl CoordConfig {
    /// Load the configuration from disk, falling back to built-in defaults.
    pub fn load() -> Self {
        let path = resolve_config_path();
        match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str::<RawConfig>(&contents) {
                Ok(raw) => {
                    let config: Self = raw.into();
                    info!(path = %path.display(), "loaded coordination config");
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

/// JSON representation of the configuration file.
#[derive(Debug, Deserialize)]
struct RawConfig {
    board_snapshot_limit: Option<usize>,
    max_move_payload_bytes: Option<usize>,
}

impl From<RawConfig> for CoordConfig {
    fn from(raw: RawConfig) -> Self {
        let defaults = CoordConfig::default();
        Self {
            board_snapshot_limit: raw
                .board_snapshot_limit
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.board_snapshot_limit),
            max_move_payload_bytes: raw
                .max_move_payload_bytes
                .filter(|limit| *limit > 0)
                .unwrap_or(defaults.max_move_payload_bytes),
        }
    }
}

/// Resolve the configuration path taking the environment override into
/// account.
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
    fn partial_config_keeps_defaults_for_missing_fields() {
        let raw: RawConfig = serde_json::from_str(r#"{"board_snapshot_limit": 25}"#).unwrap();
        let config: CoordConfig = raw.into();
        assert_eq!(config.board_snapshot_limit, 25);
        assert_eq!(
            config.max_move_payload_bytes,
            DEFAULT_MAX_MOVE_PAYLOAD_BYTES
        );
    }

    #[test]
    fn zero_limits_fall_back_to_defaults() {
        let raw: RawConfig =
            serde_json::from_str(r#"{"board_snapshot_limit": 0, "max_move_payload_bytes": 0}"#)
                .unwrap();
        let config: CoordConfig = raw.into();
        assert_eq!(config, CoordConfig::default());
    }
}
