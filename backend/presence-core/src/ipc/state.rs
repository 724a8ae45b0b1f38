//! Connection lifecycle states and the events that drive the worker.

use models::ActivityPayload;

use std::fmt::{Display, Formatter, Result as FormatResult};

use tokio::sync::oneshot;

/// Where the worker is in its connect → handshake → serve cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Handshaking,
    Connected,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }
}

impl Display for ConnectionState {
    fn fmt(&self, f: &mut Formatter<'_>) -> FormatResult {
        match self {
            ConnectionState::Disconnected => write!(f, "disconnected"),
            ConnectionState::Handshaking => write!(f, "handshaking"),
            ConnectionState::Connected => write!(f, "connected"),
        }
    }
}

/// What happened to a `send_activity` / `clear_activity` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// The daemon acknowledged the update.
    Accepted,
    /// No live connection; nothing was written.
    NotConnected,
    /// Dropped locally: too soon after the previous accepted update.
    RateLimited,
    /// The daemon answered with its rate-limit error code.
    PeerRateLimited,
    /// The daemon answered with some other error.
    Rejected { code: Option<i64>, message: String },
    /// Written, but the reply could not be understood.
    Unconfirmed,
    /// The write or the reply read failed; a reconnect is pending.
    Failed,
}

impl SendOutcome {
    pub fn is_accepted(&self) -> bool {
        *self == SendOutcome::Accepted
    }
}

/// Inputs to the worker, processed strictly one at a time.
#[derive(Debug)]
pub(crate) enum ConnectionEvent {
    KeepaliveDue,
    ReconnectRequested,
    SendRequested {
        activity: ActivityPayload,
        reply: oneshot::Sender<SendOutcome>,
    },
    ClearRequested {
        reply: oneshot::Sender<SendOutcome>,
    },
    ShutdownRequested,
}
