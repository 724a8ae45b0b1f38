//! The connection worker task.
//!
//! One worker per [`PresenceClient`]. It exclusively owns the transport, the
//! connection state, the rate limiter, the backoff counter and the replay
//! cache, and processes [`ConnectionEvent`]s one at a time:
//!
//! | State        | Event / condition     | Action                                    |
//! |--------------|-----------------------|-------------------------------------------|
//! | Disconnected | (loop pass)           | connect, then Handshaking                 |
//! | Disconnected | connect fails         | backoff wait, stay Disconnected           |
//! | Handshaking  | READY received        | reset backoff, Connected, replay cache    |
//! |              |                       | unless a clear was requested since        |
//! | Handshaking  | anything else         | close, backoff wait, Disconnected         |
//! | Connected    | KeepaliveDue          | PING, expect PONG                         |
//! | Connected    | SendRequested         | rate-limit check, SET_ACTIVITY, read ack  |
//! | Connected    | ClearRequested        | drop cache, SET_ACTIVITY null, read ack   |
//! | Connected    | ReconnectRequested    | close, backoff wait, Disconnected         |
//! | any          | ShutdownRequested     | close transport, exit                     |
//!
//! [`PresenceClient`]: crate::ipc::PresenceClient

use crate::config::PresenceConfig;
use crate::error::LinkError;
use crate::error::protocol::ProtocolError;
use crate::error::transport::TransportError;
use crate::ipc::backoff::BackoffCounter;
use crate::ipc::frame::{Frame, Opcode, read_frame, write_frame};
use crate::ipc::message::{Acknowledgement, CloseReason, Handshake, Response, SetActivity};
use crate::ipc::rate_limit::RateLimitGuard;
use crate::ipc::state::{ConnectionEvent, ConnectionState, SendOutcome};
use crate::transport::{Connector, Transport};

use models::ActivityPayload;

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use log::{debug, error, info, trace, warn};
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::{Instant, sleep_until, timeout};

/// Payload of a keepalive PING.
const PING_PAYLOAD: &[u8] = b"{}";

enum Flow {
    Continue,
    Exit,
}

/// Last accepted SET_ACTIVITY body, tagged with the clear generation it was
/// accepted under.
struct CachedActivity {
    payload: String,
    generation: u64,
}

pub(crate) struct Worker<C: Connector> {
    connector: C,
    client_id: u64,
    pid: u32,
    io_timeout: Duration,
    keepalive_interval: Duration,
    events: mpsc::Receiver<ConnectionEvent>,
    state_tx: watch::Sender<ConnectionState>,
    transport: Option<Transport<C::Stream>>,
    backoff: BackoffCounter,
    rate_limit: RateLimitGuard,
    replay_cache: Option<CachedActivity>,
    /// Bumped by every `clear_activity` call, before it reaches the queue.
    clear_generation: Arc<AtomicU64>,
    pending_reconnect: bool,
    next_keepalive: Instant,
}

impl<C: Connector> Worker<C> {
    pub(crate) fn new(
        connector: C,
        config: &PresenceConfig,
        events: mpsc::Receiver<ConnectionEvent>,
        state_tx: watch::Sender<ConnectionState>,
        clear_generation: Arc<AtomicU64>,
    ) -> Self {
        Self {
            connector,
            client_id: config.client_id,
            pid: std::process::id(),
            io_timeout: config.io_timeout(),
            keepalive_interval: config.keepalive_interval(),
            events,
            state_tx,
            transport: None,
            backoff: BackoffCounter::new(),
            rate_limit: RateLimitGuard::new(config.min_update_interval()),
            replay_cache: None,
            clear_generation,
            pending_reconnect: false,
            next_keepalive: Instant::now(),
        }
    }

    /// Run until shutdown is requested or every client handle is dropped.
    pub(crate) async fn run(mut self) {
        info!(
            "Presence worker started (client_id={}, pid={})",
            self.client_id, self.pid
        );

        loop {
            let flow = if self.transport.is_some() {
                self.serve_connected().await
            } else {
                self.establish().await
            };

            if let Flow::Exit = flow {
                break;
            }
        }

        self.disconnect().await;
        info!("Presence worker stopped");
    }

    // ------------------------------------------------------------------ //
    // Disconnected / Handshaking
    // ------------------------------------------------------------------ //

    async fn establish(&mut self) -> Flow {
        match self.open_link().await {
            Ok(()) => {
                self.backoff.reset();
                self.next_keepalive = Instant::now() + self.keepalive_interval;
                self.set_state(ConnectionState::Connected);
                info!("Connected to chat client");

                self.replay_cached().await;
                Flow::Continue
            }
            Err(e) => {
                warn!("Connection attempt failed: {e}");
                self.disconnect().await;
                self.wait_backoff().await
            }
        }
    }

    async fn open_link(&mut self) -> Result<(), LinkError> {
        let stream = timeout(self.io_timeout, self.connector.connect())
            .await
            .map_err(|_| TransportError::timeout("connect", self.io_timeout))??;

        self.transport = Some(Transport::new(stream));
        self.set_state(ConnectionState::Handshaking);

        self.handshake().await
    }

    async fn handshake(&mut self) -> Result<(), LinkError> {
        let request = Frame::json(Opcode::Handshake, &Handshake::new(self.client_id))?;
        debug!("Sending handshake: {}", request.payload_lossy());

        let reply = self.exchange(&request).await?;
        match reply.opcode {
            Opcode::Frame => {}
            Opcode::Close => {
                return Err(ProtocolError::peer_closed(CloseReason::describe(&reply)).into());
            }
            other => return Err(ProtocolError::unexpected_opcode("FRAME", other).into()),
        }

        let response: Response = reply.parse_json()?;
        if !response.is_ready() {
            return Err(ProtocolError::handshake(format!(
                "expected READY event, got {:?}",
                response.evt
            ))
            .into());
        }

        debug!("Handshake response: {}", reply.payload_lossy());
        Ok(())
    }

    /// Resend the last accepted activity right after a fresh handshake.
    ///
    /// Skipped when a clear was requested after the activity was cached, even
    /// if that clear is still waiting in the queue. A failure here only flags
    /// a reconnect; the handshake itself stands.
    async fn replay_cached(&mut self) {
        let current = self.clear_generation.load(Ordering::Acquire);
        if self
            .replay_cache
            .as_ref()
            .is_some_and(|cached| cached.generation != current)
        {
            debug!("Cached activity was cleared; not restoring it");
            self.replay_cache = None;
        }

        let Some(payload) = self.replay_cache.as_ref().map(|cached| cached.payload.clone()) else {
            return;
        };

        info!("Restoring previous activity state");
        match self.transmit(&payload).await {
            SendOutcome::Accepted => debug!("Restored activity acknowledged"),
            outcome => warn!("Restoring activity did not succeed: {outcome:?}"),
        }
    }

    /// Sleep out the backoff delay while still answering callers.
    async fn wait_backoff(&mut self) -> Flow {
        let delay = self.backoff.next_delay();
        info!(
            "Waiting {} seconds before reconnecting (attempt {})",
            delay.as_secs(),
            self.backoff.attempts()
        );

        let deadline = Instant::now() + delay;
        loop {
            tokio::select! {
                () = sleep_until(deadline) => return Flow::Continue,
                event = self.events.recv() => {
                    if let Flow::Exit = self.handle_disconnected(event) {
                        return Flow::Exit;
                    }
                }
            }
        }
    }

    fn handle_disconnected(&mut self, event: Option<ConnectionEvent>) -> Flow {
        match event {
            None | Some(ConnectionEvent::ShutdownRequested) => return Flow::Exit,
            Some(ConnectionEvent::SendRequested { reply, .. }) => {
                debug!("Can't update presence: not connected");
                respond(reply, SendOutcome::NotConnected);
            }
            Some(ConnectionEvent::ClearRequested { reply }) => {
                debug!("Clear requested while disconnected; dropping cached activity");
                self.replay_cache = None;
                respond(reply, SendOutcome::NotConnected);
            }
            Some(ConnectionEvent::KeepaliveDue | ConnectionEvent::ReconnectRequested) => {}
        }
        Flow::Continue
    }

    // ------------------------------------------------------------------ //
    // Connected
    // ------------------------------------------------------------------ //

    async fn serve_connected(&mut self) -> Flow {
        let event = if self.pending_reconnect {
            self.pending_reconnect = false;
            ConnectionEvent::ReconnectRequested
        } else {
            tokio::select! {
                () = sleep_until(self.next_keepalive) => ConnectionEvent::KeepaliveDue,
                event = self.events.recv() => event.unwrap_or(ConnectionEvent::ShutdownRequested),
            }
        };

        self.handle_connected(event).await
    }

    async fn handle_connected(&mut self, event: ConnectionEvent) -> Flow {
        match event {
            ConnectionEvent::KeepaliveDue => {
                self.keepalive().await;
                self.next_keepalive = Instant::now() + self.keepalive_interval;
                Flow::Continue
            }
            ConnectionEvent::ReconnectRequested => {
                info!("Reconnecting to chat client");
                self.disconnect().await;
                self.wait_backoff().await
            }
            ConnectionEvent::SendRequested { activity, reply } => {
                let outcome = self.send_activity(&activity).await;
                respond(reply, outcome);
                Flow::Continue
            }
            ConnectionEvent::ClearRequested { reply } => {
                let outcome = self.clear_activity().await;
                respond(reply, outcome);
                Flow::Continue
            }
            ConnectionEvent::ShutdownRequested => Flow::Exit,
        }
    }

    async fn keepalive(&mut self) {
        let ping = Frame::new(Opcode::Ping, PING_PAYLOAD);

        match self.exchange(&ping).await {
            Ok(reply) if reply.opcode == Opcode::Pong => trace!("Received PONG"),
            Ok(reply) if reply.opcode == Opcode::Close => {
                warn!(
                    "Chat client closed the connection: {}",
                    CloseReason::describe(&reply)
                );
                self.pending_reconnect = true;
            }
            Ok(reply) => warn!("Unexpected response to PING: {}", reply.opcode),
            Err(e) => {
                warn!("Keepalive failed: {e}");
                self.pending_reconnect = true;
            }
        }
    }

    async fn send_activity(&mut self, activity: &ActivityPayload) -> SendOutcome {
        let now = Instant::now();
        if !self.rate_limit.permits(now) {
            debug!(
                "Rate limiting: skipping presence update ({:?} until next allowed)",
                self.rate_limit.remaining(now)
            );
            return SendOutcome::RateLimited;
        }

        let payload = match SetActivity::new(self.pid, Some(activity)).to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize activity: {e}");
                return SendOutcome::Failed;
            }
        };

        debug!("Sending presence update: {payload}");
        let outcome = self.transmit(&payload).await;

        match outcome {
            SendOutcome::Accepted => {
                self.rate_limit.record_success(now);
                self.replay_cache = Some(CachedActivity {
                    payload,
                    generation: self.clear_generation.load(Ordering::Acquire),
                });
            }
            SendOutcome::Rejected { .. } => self.rate_limit.record_success(now),
            _ => {}
        }

        outcome
    }

    async fn clear_activity(&mut self) -> SendOutcome {
        self.replay_cache = None;

        let payload = match SetActivity::new(self.pid, None).to_json() {
            Ok(payload) => payload,
            Err(e) => {
                error!("Failed to serialize clear command: {e}");
                return SendOutcome::Failed;
            }
        };

        info!("Clearing presence");
        let now = Instant::now();
        let outcome = self.transmit(&payload).await;
        if outcome.is_accepted() {
            self.rate_limit.record_success(now);
        }
        outcome
    }

    /// Write one SET_ACTIVITY body and classify the daemon's answer.
    async fn transmit(&mut self, payload: &str) -> SendOutcome {
        let frame = Frame::new(Opcode::Frame, payload.as_bytes());

        let reply = match self.exchange(&frame).await {
            Ok(reply) => reply,
            Err(e) => {
                warn!("Failed to send activity command: {e}");
                self.pending_reconnect = true;
                return SendOutcome::Failed;
            }
        };

        match Acknowledgement::from_frame(&reply) {
            Ok(Acknowledgement::Accepted {
                missing_large_image,
            }) => {
                if missing_large_image {
                    warn!(
                        "Large image asset was not found; make sure it is uploaded for application {}",
                        self.client_id
                    );
                }
                SendOutcome::Accepted
            }
            Ok(Acknowledgement::RateLimited) => {
                warn!("Chat client rate limit hit, update dropped");
                SendOutcome::PeerRateLimited
            }
            Ok(Acknowledgement::Rejected { code, message }) => {
                warn!("Chat client rejected presence update: code {code:?}: {message}");
                SendOutcome::Rejected { code, message }
            }
            Err(ProtocolError::PeerClosed { message, .. }) => {
                warn!("Chat client closed the connection: {message}");
                self.pending_reconnect = true;
                SendOutcome::Failed
            }
            Err(e) => {
                warn!(
                    "Failed to parse acknowledgement ({e}): {}",
                    reply.payload_lossy()
                );
                SendOutcome::Unconfirmed
            }
        }
    }

    // ------------------------------------------------------------------ //
    // Plumbing
    // ------------------------------------------------------------------ //

    /// Write `frame` and read the next frame back, each under the I/O timeout.
    async fn exchange(&mut self, frame: &Frame) -> Result<Frame, LinkError> {
        let transport = self
            .transport
            .as_mut()
            .ok_or_else(|| TransportError::closed("no open transport"))?;

        write_frame(transport, frame, self.io_timeout).await?;
        read_frame(transport, self.io_timeout).await
    }

    async fn disconnect(&mut self) {
        if let Some(mut transport) = self.transport.take() {
            transport.close().await;
        }
        self.pending_reconnect = false;
        self.set_state(ConnectionState::Disconnected);
    }

    fn set_state(&self, state: ConnectionState) {
        let previous = self.state_tx.send_replace(state);
        if previous != state {
            debug!("Connection state {previous} -> {state}");
        }
    }
}

fn respond(reply: oneshot::Sender<SendOutcome>, outcome: SendOutcome) {
    if reply.send(outcome).is_err() {
        trace!("Caller stopped waiting for the outcome");
    }
}
