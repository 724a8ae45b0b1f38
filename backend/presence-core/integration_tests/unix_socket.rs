//! End-to-end tests against a fake daemon listening on a real unix socket.

use presence_core::config::PresenceConfig;
use presence_core::error::{CoreError, TransportError};
use presence_core::ipc::frame::{Frame, Opcode, read_frame, write_frame};
use presence_core::ipc::{ConnectionState, SendOutcome, start_presence_client};
use presence_core::presence::PresencePublisher;
use presence_core::transport::{Connector, EndpointResolver, Transport, UnixSocketConnector};

use models::PlaybackSnapshot;

use std::path::Path;
use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::net::{UnixListener, UnixStream};
use tokio::time::timeout;

const LIMIT: Duration = Duration::from_secs(5);

fn config_for(dir: &Path) -> PresenceConfig {
    PresenceConfig {
        client_id: 987_654_321,
        ipc_dir: Some(dir.to_path_buf()),
        ..PresenceConfig::default()
    }
}

async fn accept(listener: &UnixListener) -> Transport<UnixStream> {
    let (stream, _) = timeout(LIMIT, listener.accept())
        .await
        .expect("Client should connect in time")
        .expect("Accept should succeed");
    Transport::new(stream)
}

async fn recv_json(daemon: &mut Transport<UnixStream>) -> (Opcode, Value) {
    let frame = read_frame(daemon, LIMIT).await.expect("Daemon should read a frame");
    (frame.opcode, frame.parse_json().expect("Frame should be JSON"))
}

async fn send_json(daemon: &mut Transport<UnixStream>, body: Value) {
    let frame = Frame::json(Opcode::Frame, &body).unwrap();
    write_frame(daemon, &frame, LIMIT)
        .await
        .expect("Daemon should write a frame");
}

async fn handshake(daemon: &mut Transport<UnixStream>) -> Value {
    let (opcode, body) = recv_json(daemon).await;
    assert_eq!(opcode, Opcode::Handshake);
    send_json(daemon, json!({ "cmd": "DISPATCH", "evt": "READY", "data": { "v": 1 } })).await;
    body
}

/// **VALUE**: Verifies the whole path from snapshot to socket bytes.
///
/// **WHY THIS MATTERS**: Unit tests use in-memory streams. This proves endpoint
/// discovery, the unix back-end, framing, and the publisher all agree on a real
/// socket.
///
/// **BUG THIS CATCHES**: Would catch:
/// - Socket path built from the wrong name or directory
/// - Handshake id sent as a number
/// - Activity envelope missing pid or nonce
#[tokio::test]
async fn given_daemon_on_socket_when_publishing_then_receives_activity() {
    // GIVEN: A daemon listening on slot 0 of a private directory
    let dir = TempDir::new().unwrap();
    let listener = UnixListener::bind(dir.path().join("discord-ipc-0")).unwrap();
    let client = start_presence_client(config_for(dir.path())).unwrap();

    let mut daemon = accept(&listener).await;
    let hello = handshake(&mut daemon).await;
    assert_eq!(hello, json!({ "client_id": "987654321", "v": 1 }));
    assert!(timeout(LIMIT, client.wait_until(ConnectionState::Connected)).await.unwrap());

    // WHEN: A playing snapshot is published
    let snapshot = PlaybackSnapshot {
        is_playing: true,
        media_type: String::from("Movie"),
        title: String::from("Arrival"),
        state_label: String::from("playing"),
        progress_seconds: 60,
        duration_seconds: 6960,
        ..PlaybackSnapshot::default()
    };
    let mut publisher = PresencePublisher::new(client.clone());
    let (outcome, (opcode, command)) = tokio::join!(publisher.sync(Some(&snapshot)), async {
        let received = recv_json(&mut daemon).await;
        send_json(
            &mut daemon,
            json!({ "cmd": "SET_ACTIVITY", "data": received.1["args"]["activity"], "evt": null }),
        )
        .await;
        received
    });

    // THEN
    assert_eq!(outcome, Some(SendOutcome::Accepted));
    assert_eq!(opcode, Opcode::Frame);
    assert_eq!(command["cmd"], "SET_ACTIVITY");
    assert_eq!(command["args"]["pid"], std::process::id());
    assert_eq!(command["args"]["activity"]["details"], "Arrival");
    assert!(command["args"]["activity"]["timestamps"]["end"].is_i64());
    assert!(command["nonce"].is_string());

    client.shutdown().await;
}

/// **VALUE**: A daemon on a later slot is still found.
///
/// **BUG THIS CATCHES**: Would catch the connector giving up after slot 0.
#[tokio::test]
async fn given_daemon_on_later_slot_when_connecting_then_found() {
    // GIVEN: Only slot 4 is listening
    let dir = TempDir::new().unwrap();
    let listener = UnixListener::bind(dir.path().join("discord-ipc-4")).unwrap();

    // WHEN
    let client = start_presence_client(config_for(dir.path())).unwrap();
    let mut daemon = accept(&listener).await;
    handshake(&mut daemon).await;

    // THEN
    assert!(timeout(LIMIT, client.wait_until(ConnectionState::Connected)).await.unwrap());

    client.shutdown().await;
}

#[tokio::test]
async fn given_daemon_when_client_shuts_down_then_socket_reaches_eof() {
    // GIVEN: A connected client
    let dir = TempDir::new().unwrap();
    let listener = UnixListener::bind(dir.path().join("discord-ipc-0")).unwrap();
    let client = start_presence_client(config_for(dir.path())).unwrap();
    let mut daemon = accept(&listener).await;
    handshake(&mut daemon).await;
    assert!(timeout(LIMIT, client.wait_until(ConnectionState::Connected)).await.unwrap());

    // WHEN
    client.shutdown().await;

    // THEN
    assert!(read_frame(&mut daemon, LIMIT).await.is_err());
    assert_eq!(client.state(), ConnectionState::Disconnected);
}

#[tokio::test]
async fn given_missing_ipc_dir_when_starting_then_config_rejected() {
    let config = PresenceConfig {
        ipc_dir: Some(Path::new("/nonexistent/presence/ipc").to_path_buf()),
        ..PresenceConfig::default()
    };

    assert!(matches!(
        start_presence_client(config),
        Err(CoreError::Config(_))
    ));
}

#[tokio::test]
async fn given_empty_ipc_dir_when_connecting_then_no_endpoint() {
    // GIVEN: A directory with no sockets in it
    let dir = TempDir::new().unwrap();
    let connector = UnixSocketConnector::new(EndpointResolver::with_base_dir(dir.path()));

    // WHEN
    let result = connector.connect().await;

    // THEN: Every candidate refused
    assert!(matches!(result, Err(TransportError::NoEndpoint { .. })));
}

/// **VALUE**: A misconfigured endpoint is reported as such instead of looking
/// like "chat client not running".
///
/// **BUG THIS CATCHES**: Would catch every connect failure being folded into
/// `NoEndpoint`, which hides the reason from the log.
#[tokio::test]
async fn given_unusable_socket_path_when_connecting_then_connect_error_names_endpoint() {
    // GIVEN: A base directory whose socket paths exceed the unix path limit
    let dir = TempDir::new().unwrap();
    let too_long = dir.path().join("x".repeat(120));
    let connector = UnixSocketConnector::new(EndpointResolver::with_base_dir(&too_long));

    // WHEN
    let result = connector.connect().await;

    // THEN: The first candidate is named in the error
    match result {
        Err(TransportError::Connect { endpoint, .. }) => {
            assert!(endpoint.ends_with("discord-ipc-0"));
        }
        other => panic!("Expected Connect error, got {other:?}"),
    }
}
