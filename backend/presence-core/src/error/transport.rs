//! Transport-level failures: the byte stream itself misbehaved.
//!
//! Every variant is recoverable by disconnecting and backing off.

use common::ErrorLocation;

use std::io::Error as IoError;
use std::panic::Location;
use std::time::Duration;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum TransportError {
    #[error("Connect Error: {endpoint}: {message} {location}")]
    Connect {
        endpoint: String,
        message: String,
        location: ErrorLocation,
    },

    /// None of the candidate endpoints accepted a connection.
    #[error("No Endpoint Error: {message} {location}")]
    NoEndpoint {
        message: String,
        location: ErrorLocation,
    },

    #[error("Read Error: {message} {location}")]
    Read {
        message: String,
        location: ErrorLocation,
    },

    #[error("Write Error: {message} {location}")]
    Write {
        message: String,
        location: ErrorLocation,
    },

    #[error("Closed Error: {message} {location}")]
    Closed {
        message: String,
        location: ErrorLocation,
    },

    #[error("Timeout Error: {operation} did not finish within {timeout:?} {location}")]
    Timeout {
        operation: &'static str,
        timeout: Duration,
        location: ErrorLocation,
    },
}

impl TransportError {
    #[track_caller]
    pub fn connect(endpoint: impl Into<String>, error: &IoError) -> Self {
        TransportError::Connect {
            endpoint: endpoint.into(),
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn no_endpoint(message: impl Into<String>) -> Self {
        TransportError::NoEndpoint {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn read(error: &IoError) -> Self {
        TransportError::Read {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn write(error: &IoError) -> Self {
        TransportError::Write {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn closed(message: impl Into<String>) -> Self {
        TransportError::Closed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn timeout(operation: &'static str, timeout: Duration) -> Self {
        TransportError::Timeout {
            operation,
            timeout,
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
