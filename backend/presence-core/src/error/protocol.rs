//! Protocol-level failures: bytes arrived but did not mean what we expected.

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ProtocolError {
    #[error("Unknown Opcode Error: {opcode} {location}")]
    UnknownOpcode { opcode: u32, location: ErrorLocation },

    #[error("Unexpected Opcode Error: expected {expected}, got {actual} {location}")]
    UnexpectedOpcode {
        expected: &'static str,
        actual: String,
        location: ErrorLocation,
    },

    #[error("Frame Too Large Error: {length} bytes exceeds {max} {location}")]
    FrameTooLarge {
        length: u32,
        max: u32,
        location: ErrorLocation,
    },

    #[error("Truncated Frame Error: expected {expected} bytes, got {actual} {location}")]
    Truncated {
        expected: usize,
        actual: usize,
        location: ErrorLocation,
    },

    #[error("JSON Error: {message} {location}")]
    Json {
        message: String,
        location: ErrorLocation,
    },

    #[error("Handshake Error: {message} {location}")]
    Handshake {
        message: String,
        location: ErrorLocation,
    },

    /// The daemon sent a Close frame.
    #[error("Peer Closed Error: {message} {location}")]
    PeerClosed {
        message: String,
        location: ErrorLocation,
    },
}

impl ProtocolError {
    #[track_caller]
    pub fn handshake(message: impl Into<String>) -> Self {
        ProtocolError::Handshake {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn peer_closed(message: impl Into<String>) -> Self {
        ProtocolError::PeerClosed {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    #[track_caller]
    pub fn unexpected_opcode(expected: &'static str, actual: impl ToString) -> Self {
        ProtocolError::UnexpectedOpcode {
            expected,
            actual: actual.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<serde_json::Error> for ProtocolError {
    #[track_caller]
    fn from(error: serde_json::Error) -> Self {
        ProtocolError::Json {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
