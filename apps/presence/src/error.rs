use common::ErrorLocation;

use presence_core::error::{ConfigError, CoreError};

use std::panic::Location;

use serde::Serialize;
use thiserror::Error;

/// Errors that stop the presence application.
///
/// Serializable so a fatal error can be written to the log as structured
/// JSON; location tracking is kept on every variant.
#[derive(Debug, Error, Serialize)]
#[serde(tag = "type", content = "data")]
pub enum AppError {
    /// Error from this App
    #[error("Presence Error: {message} {location}")]
    Presence {
        message: String,
        location: ErrorLocation,
    },

    /// Invalid or unreadable configuration
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// Error from presence-core operations
    #[error("Core Error: {message} {location}")]
    Core {
        message: String,
        location: ErrorLocation,
    },

    /// Filesystem or logger setup failed
    #[error("Logger Error: {message} {location}")]
    Logger {
        message: String,
        location: ErrorLocation,
    },
}

impl From<ConfigError> for AppError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        AppError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<CoreError> for AppError {
    #[track_caller]
    fn from(error: CoreError) -> Self {
        AppError::Core {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
