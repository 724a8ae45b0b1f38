//! Caller-facing handle to a running presence worker.

use crate::ipc::state::{ConnectionEvent, ConnectionState, SendOutcome};

use models::ActivityPayload;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use log::{debug, warn};
use tokio::sync::{Mutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;

/// Handle to the background connection worker.
///
/// Cheap to clone; every clone talks to the same worker. All operations are
/// serialized by the worker in the order their events are received.
///
/// # Lifecycle
///
/// The worker runs until [`shutdown`](Self::shutdown) is called or the last
/// handle is dropped. Only `shutdown` waits for the transport to be closed.
#[derive(Debug, Clone)]
pub struct PresenceClient {
    events: mpsc::Sender<ConnectionEvent>,
    state: watch::Receiver<ConnectionState>,
    clear_generation: Arc<AtomicU64>,
    task: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PresenceClient {
    pub(crate) fn new(
        events: mpsc::Sender<ConnectionEvent>,
        state: watch::Receiver<ConnectionState>,
        clear_generation: Arc<AtomicU64>,
        task: JoinHandle<()>,
    ) -> Self {
        Self {
            events,
            state,
            clear_generation,
            task: Arc::new(Mutex::new(Some(task))),
        }
    }

    /// Latest published connection state.
    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    pub fn is_connected(&self) -> bool {
        self.state().is_connected()
    }

    /// A receiver that observes every state change from now on.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.clone()
    }

    /// Resolve once the worker reaches `target`.
    ///
    /// Returns `false` if the worker stopped first.
    pub async fn wait_until(&self, target: ConnectionState) -> bool {
        let mut state = self.state.clone();
        state.wait_for(|current| *current == target).await.is_ok()
    }

    /// Publish `activity`.
    ///
    /// Returns [`SendOutcome::NotConnected`] without touching the worker when
    /// no connection is live. Otherwise the outcome reflects the daemon's
    /// reply, or the local rate limit.
    pub async fn send_activity(&self, activity: ActivityPayload) -> SendOutcome {
        if !self.is_connected() {
            debug!("Can't update presence: not connected");
            return SendOutcome::NotConnected;
        }

        self.request(|reply| ConnectionEvent::SendRequested { activity, reply })
            .await
    }

    /// Remove the published activity and forget the replay cache.
    ///
    /// The cache is invalidated immediately, whatever the connection state, so
    /// a reconnect in progress will not bring the old activity back. Returns
    /// [`SendOutcome::NotConnected`] without waiting when no connection is live.
    pub async fn clear_activity(&self) -> SendOutcome {
        self.clear_generation.fetch_add(1, Ordering::AcqRel);

        if !self.is_connected() {
            debug!("Presence cleared while not connected");
            return SendOutcome::NotConnected;
        }

        self.request(|reply| ConnectionEvent::ClearRequested { reply })
            .await
    }

    /// Drop the current connection and reconnect after the backoff delay.
    pub async fn request_reconnect(&self) {
        if self
            .events
            .send(ConnectionEvent::ReconnectRequested)
            .await
            .is_err()
        {
            debug!("Reconnect requested after the worker stopped");
        }
    }

    /// Stop the worker and wait until the transport is closed.
    ///
    /// Safe to call from several clones; later calls return immediately.
    pub async fn shutdown(&self) {
        let mut task = self.task.lock().await;
        let Some(handle) = task.take() else {
            return;
        };

        if self
            .events
            .send(ConnectionEvent::ShutdownRequested)
            .await
            .is_err()
        {
            debug!("Worker already stopped");
        }

        if let Err(e) = handle.await {
            warn!("Presence worker ended abnormally: {e}");
        }
    }

    async fn request<F>(&self, build: F) -> SendOutcome
    where
        F: FnOnce(oneshot::Sender<SendOutcome>) -> ConnectionEvent,
    {
        let (reply, outcome) = oneshot::channel();

        if self.events.send(build(reply)).await.is_err() {
            debug!("Presence worker is not running");
            return SendOutcome::NotConnected;
        }

        outcome.await.unwrap_or(SendOutcome::NotConnected)
    }
}
