use presence::runner::run;
use presence::source::StdinPlaybackSource;

use presence_core::config::PresenceConfig;
use presence_core::ipc::frame::{Frame, Opcode, read_frame, write_frame};
use presence_core::ipc::{ConnectionState, start_presence_client};
use presence_core::presence::PresencePublisher;
use presence_core::transport::Transport;

use std::time::Duration;

use serde_json::{Value, json};
use tempfile::TempDir;
use tokio::io::{AsyncWriteExt, BufReader, duplex};
use tokio::net::UnixListener;
use tokio::sync::oneshot;
use tokio::time::timeout;

const LIMIT: Duration = Duration::from_secs(5);

// ============================================================================
// Integration tests for the full input → socket pipeline
// ============================================================================

/// **VALUE**: Tests the path a real deployment takes: JSON lines in, SET_ACTIVITY out.
///
/// **WHY THIS MATTERS**: Each piece is unit tested alone. This catches
/// disagreements between the line format, the publisher, and the socket client.
///
/// **BUG THIS CATCHES**: Would catch if the source's field aliases drift from what
/// the tracker expects, or if the run loop never feeds the publisher.
#[tokio::test]
async fn given_playing_line_when_running_then_daemon_receives_activity() {
    // GIVEN: A daemon on a private socket and a connected client
    let dir = TempDir::new().unwrap();
    let listener = UnixListener::bind(dir.path().join("discord-ipc-0")).unwrap();
    let config = PresenceConfig {
        ipc_dir: Some(dir.path().to_path_buf()),
        poll_interval_secs: 1,
        ..PresenceConfig::default()
    };
    let client = start_presence_client(config.clone()).unwrap();

    let (stream, _) = timeout(LIMIT, listener.accept()).await.unwrap().unwrap();
    let mut daemon = Transport::new(stream);
    let handshake = read_frame(&mut daemon, LIMIT).await.unwrap();
    assert_eq!(handshake.opcode, Opcode::Handshake);
    let ready = json!({ "cmd": "DISPATCH", "evt": "READY", "data": {} });
    write_frame(&mut daemon, &Frame::json(Opcode::Frame, &ready).unwrap(), LIMIT)
        .await
        .unwrap();
    assert!(timeout(LIMIT, client.wait_until(ConnectionState::Connected)).await.unwrap());

    // GIVEN: A playing line already on the input
    let (reader, mut writer) = duplex(1024);
    writer
        .write_all(b"{\"state\":\"playing\",\"media_type\":\"TV Show\",\"title\":\"Severance\",\"subtitle\":\"Good News About Hell\",\"progress\":30,\"duration\":3300}\n")
        .await
        .unwrap();
    let mut source = StdinPlaybackSource::from_reader(BufReader::new(reader));
    assert!(source.changed().await);

    // WHEN: Running the loop until the daemon has answered one update
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let mut publisher = PresencePublisher::new(client.clone());
    let daemon_side = async move {
        let command = read_frame(&mut daemon, LIMIT).await.unwrap();
        let body: Value = command.parse_json().unwrap();
        let ack = json!({ "cmd": "SET_ACTIVITY", "data": body["args"]["activity"], "evt": null });
        write_frame(&mut daemon, &Frame::json(Opcode::Frame, &ack).unwrap(), LIMIT)
            .await
            .unwrap();
        stop_tx.send(()).unwrap();
        (body, daemon)
    };
    let shutdown = async {
        let _ = stop_rx.await;
    };
    let (polls, (body, _daemon)) = tokio::join!(
        run(&mut source, &mut publisher, config.poll_interval(), shutdown),
        daemon_side
    );

    // THEN: The activity matches the line
    assert!(polls >= 1);
    assert_eq!(body["cmd"], "SET_ACTIVITY");
    assert_eq!(
        body["args"]["activity"]["details"],
        "Severance - Good News About Hell"
    );
    assert_eq!(body["args"]["activity"]["state"], "TV Show");
    assert!(publisher.tracker().is_showing());

    client.shutdown().await;
}
