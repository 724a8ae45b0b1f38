//! Local IPC client for the chat client's rich-presence daemon.
//!
//! The daemon speaks a framed protocol over a unix socket or named pipe.
//! This module provides:
//!
//! - Frame codec with opcode validation ([`frame`])
//! - JSON handshake and `SET_ACTIVITY` bodies ([`message`])
//! - A single background worker owning the connection ([`PresenceClient`])
//! - Exponential reconnect backoff and a local update rate limit
//!
//! # Architecture
//!
//! Callers never touch the transport. [`start_presence_client`] spawns one
//! worker task; the returned [`PresenceClient`] posts events to it over a
//! channel and observes [`ConnectionState`] through a watch channel. Every
//! state change happens inside the worker, so there are no locks around the
//! connection.
//!
//! # Recovery
//!
//! Any transport or protocol failure drops the connection, waits out the
//! backoff delay (2s doubling to a 60s cap, reset on a successful handshake)
//! and tries again. After each successful handshake the last accepted
//! activity is replayed so the daemon's view survives its own restarts.

pub mod backoff;
pub mod frame;
mod handle;
pub mod message;
pub mod rate_limit;
mod state;
mod worker;

pub use handle::PresenceClient;
pub use state::{ConnectionState, SendOutcome};

use crate::config::PresenceConfig;
use crate::error::CoreError;
use crate::ipc::worker::Worker;
use crate::transport::{Connector, EndpointResolver, PlatformConnector};

use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use log::info;
use tokio::sync::{mpsc, watch};

/// Queue depth between handles and the worker.
const EVENT_CHANNEL_CAPACITY: usize = 32;

/// Validate `config` and spawn the connection worker for this platform.
///
/// Must be called from inside a tokio runtime. The worker starts connecting
/// immediately; use [`PresenceClient::wait_until`] to wait for the handshake.
///
/// # Errors
///
/// Returns [`CoreError::Config`] if `config` is invalid.
pub fn start_presence_client(config: PresenceConfig) -> Result<PresenceClient, CoreError> {
    config.validate()?;

    let resolver = EndpointResolver::from_config(&config);
    info!(
        "Starting presence client (endpoint dir: {}, {})",
        resolver.base_dir().display(),
        resolver.source()
    );

    Ok(spawn_worker(PlatformConnector::new(resolver), config))
}

/// Like [`start_presence_client`] with a caller-supplied [`Connector`].
///
/// # Errors
///
/// Returns [`CoreError::Config`] if `config` is invalid.
pub fn start_with_connector<C: Connector>(
    config: PresenceConfig,
    connector: C,
) -> Result<PresenceClient, CoreError> {
    config.validate()?;
    Ok(spawn_worker(connector, config))
}

fn spawn_worker<C: Connector>(connector: C, config: PresenceConfig) -> PresenceClient {
    let (events_tx, events_rx) = mpsc::channel(EVENT_CHANNEL_CAPACITY);
    let (state_tx, state_rx) = watch::channel(ConnectionState::Disconnected);

    let clear_generation = Arc::new(AtomicU64::new(0));

    let worker = Worker::new(
        connector,
        &config,
        events_rx,
        state_tx,
        Arc::clone(&clear_generation),
    );
    let task = tokio::spawn(worker.run());

    PresenceClient::new(events_tx, state_rx, clear_generation, task)
}
