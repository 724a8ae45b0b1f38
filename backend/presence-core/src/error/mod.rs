pub mod config;
pub mod protocol;
pub mod transport;

pub use config::ConfigError;
pub use protocol::ProtocolError;
pub use transport::TransportError;

use thiserror::Error;

/// Failures returned by the crate's entry points.
///
/// Connection trouble never shows up here: the worker recovers from it on its
/// own and callers only see [`SendOutcome`](crate::ipc::SendOutcome)s.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Failures that end the current connection.
///
/// Both kinds are recovered the same way: drop the link, back off, reconnect.
#[derive(Debug, Error)]
pub enum LinkError {
    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}
