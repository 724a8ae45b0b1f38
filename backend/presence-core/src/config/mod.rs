//! Explicit configuration for the presence client.
//!
//! A [`PresenceConfig`] is built once at startup (defaults, then environment
//! overrides) and handed to [`start_presence_client`]. Nothing reads it from
//! a global.
//!
//! [`start_presence_client`]: crate::ipc::start_presence_client

use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::env;
use std::panic::Location;
use std::path::PathBuf;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

/// Application id registered with the chat client for the Plex presence art.
pub const DEFAULT_CLIENT_ID: u64 = 1_359_742_002_618_564_618;

pub const ENV_CLIENT_ID: &str = "PRESENCE_CLIENT_ID";
pub const ENV_IPC_DIR: &str = "PRESENCE_IPC_DIR";
pub const ENV_POLL_INTERVAL: &str = "PRESENCE_POLL_INTERVAL";

// ============================================
// CONFIG STRUCT
// ============================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Numeric application id sent verbatim in the handshake.
    #[serde(default = "default_client_id")]
    pub client_id: u64,

    /// Directory holding the daemon's sockets. `None` means discover it.
    #[serde(default)]
    pub ipc_dir: Option<PathBuf>,

    #[serde(default = "default_keepalive_interval_secs")]
    pub keepalive_interval_secs: u64,

    /// Upper bound on every connect, read and write.
    #[serde(default = "default_io_timeout_secs")]
    pub io_timeout_secs: u64,

    /// Minimum spacing between two accepted activity updates.
    #[serde(default = "default_min_update_interval_secs")]
    pub min_update_interval_secs: u64,

    /// How often the app asks the playback source for a snapshot.
    #[serde(default = "default_poll_interval_secs")]
    pub poll_interval_secs: u64,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            client_id: default_client_id(),
            ipc_dir: None,
            keepalive_interval_secs: default_keepalive_interval_secs(),
            io_timeout_secs: default_io_timeout_secs(),
            min_update_interval_secs: default_min_update_interval_secs(),
            poll_interval_secs: default_poll_interval_secs(),
        }
    }
}

// ============================================
// DEFAULT FUNCTIONS
// ============================================

fn default_client_id() -> u64 {
    DEFAULT_CLIENT_ID
}
fn default_keepalive_interval_secs() -> u64 {
    15
}
fn default_io_timeout_secs() -> u64 {
    10
}
fn default_min_update_interval_secs() -> u64 {
    4
}
fn default_poll_interval_secs() -> u64 {
    5
}

// ============================================
// IMPLEMENTATION
// ============================================

impl PresenceConfig {
    /// Defaults overlaid with `PRESENCE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EnvError`] when a variable is set but unparsable,
    /// or [`ConfigError::ValidationError`] when the result is invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with a pluggable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(raw) = lookup(ENV_CLIENT_ID) {
            config.client_id = parse_env_u64(ENV_CLIENT_ID, &raw)?;
            debug!("Client id overridden by {ENV_CLIENT_ID}");
        }

        if let Some(raw) = lookup(ENV_IPC_DIR)
            && !raw.trim().is_empty()
        {
            config.ipc_dir = Some(PathBuf::from(raw.trim()));
        }

        if let Some(raw) = lookup(ENV_POLL_INTERVAL) {
            config.poll_interval_secs = parse_env_u64(ENV_POLL_INTERVAL, &raw)?;
        }

        config.validate()?;

        info!(
            "Presence config ready: client_id={}, ipc_dir={:?}, poll={}s",
            config.client_id, config.ipc_dir, config.poll_interval_secs
        );
        Ok(config)
    }

    /// Validate config values.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] if any value is invalid.
    #[track_caller]
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.client_id == 0 {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: String::from("client_id must be non-zero"),
            });
        }

        let intervals = [
            ("keepalive_interval_secs", self.keepalive_interval_secs),
            ("io_timeout_secs", self.io_timeout_secs),
            ("min_update_interval_secs", self.min_update_interval_secs),
            ("poll_interval_secs", self.poll_interval_secs),
        ];
        for (name, value) in intervals {
            if value == 0 {
                return Err(ConfigError::ValidationError {
                    location: ErrorLocation::from(Location::caller()),
                    reason: format!("{name} must be at least 1 second"),
                });
            }
        }

        if let Some(ref dir) = self.ipc_dir
            && !dir.is_dir()
        {
            return Err(ConfigError::ValidationError {
                location: ErrorLocation::from(Location::caller()),
                reason: format!("ipc_dir is not a directory: {}", dir.display()),
            });
        }

        Ok(())
    }

    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_secs)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }

    pub fn min_update_interval(&self) -> Duration {
        Duration::from_secs(self.min_update_interval_secs)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs)
    }
}

#[track_caller]
fn parse_env_u64(variable: &'static str, raw: &str) -> Result<u64, ConfigError> {
    raw.trim().parse::<u64>().map_err(|e| ConfigError::EnvError {
        location: ErrorLocation::from(Location::caller()),
        variable,
        reason: format!("'{raw}' is not an unsigned integer: {e}"),
    })
}
