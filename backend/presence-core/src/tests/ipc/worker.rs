use crate::ipc::ConnectionState;
use crate::ipc::SendOutcome;
use crate::ipc::frame::{Frame, Opcode};
use crate::tests::ipc::helpers::{
    ScriptedConnector, activity, activity_of, connected_client, ready_event, start_client,
};

use std::time::Duration;

use serde_json::json;
use tokio::time::{advance, sleep};

/// **VALUE**: The handshake body carries the configured client id.
///
/// **BUG THIS CATCHES**: Would catch the worker skipping the handshake or sending
/// it on the wrong opcode.
#[tokio::test(start_paused = true)]
async fn given_daemon_when_client_starts_then_handshakes_and_connects() {
    // GIVEN: One reachable daemon
    let connector = ScriptedConnector::default();
    let mut daemon = connector.expect_connection();

    // WHEN: Starting the client
    let client = start_client(&connector);
    let handshake = daemon.accept_handshake().await;

    // THEN: Handshake as configured, then Connected
    assert_eq!(handshake, json!({ "client_id": "42", "v": 1 }));
    assert!(client.wait_until(ConnectionState::Connected).await);
    assert!(client.is_connected());

    client.shutdown().await;
}

/// **VALUE**: Nothing may be sent before the daemon says READY.
///
/// **BUG THIS CATCHES**: Would catch the worker treating any reply to the
/// handshake as success, which leaves updates going into a dead session.
#[tokio::test(start_paused = true)]
async fn given_handshake_not_ready_when_sending_then_not_connected() {
    // GIVEN: A daemon that answers the handshake with an error
    let connector = ScriptedConnector::default();
    let mut daemon = connector.expect_connection();
    let client = start_client(&connector);
    let mut states = client.subscribe();

    let handshake = daemon.expect_frame().await;
    assert_eq!(handshake.opcode, Opcode::Handshake);
    daemon
        .reply_json(json!({ "evt": "ERROR", "data": { "code": 4000, "message": "nope" } }))
        .await;

    // WHEN: The worker has given up on this connection and a send arrives
    assert!(daemon.recv().await.is_err(), "Worker should hang up");
    let outcome = client.send_activity(activity("Dune")).await;

    // THEN: Never Connected; the send was not attempted
    assert_eq!(outcome, SendOutcome::NotConnected);
    assert_ne!(client.state(), ConnectionState::Connected);
    assert_ne!(*states.borrow_and_update(), ConnectionState::Connected);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_connected_when_sending_then_daemon_receives_activity_and_accepts() {
    // GIVEN
    let (client, mut daemon, _connector) = connected_client().await;

    // WHEN
    let (outcome, frame) = tokio::join!(
        client.send_activity(activity("Dune - Part Two")),
        daemon.ack_next()
    );

    // THEN
    assert_eq!(outcome, SendOutcome::Accepted);
    assert_eq!(frame.opcode, Opcode::Frame);
    let body: serde_json::Value = frame.parse_json().unwrap();
    assert_eq!(body["cmd"], "SET_ACTIVITY");
    assert_eq!(body["args"]["pid"], std::process::id());
    assert_eq!(activity_of(&frame)["details"], "Dune - Part Two");

    client.shutdown().await;
}

/// **VALUE**: The local throttle keeps us under the daemon's own limit.
///
/// **BUG THIS CATCHES**: Would catch the rate clock never being stamped, or
/// being compared against the wrong instant.
#[tokio::test(start_paused = true)]
async fn given_accepted_update_when_sending_again_two_seconds_later_then_dropped_locally() {
    // GIVEN: One accepted update
    let (client, mut daemon, _connector) = connected_client().await;
    let (first, _) = tokio::join!(client.send_activity(activity("A")), daemon.ack_next());
    assert_eq!(first, SendOutcome::Accepted);

    // WHEN: A second update 2 seconds later
    advance(Duration::from_secs(2)).await;
    let second = client.send_activity(activity("B")).await;

    // THEN: Dropped without touching the wire
    assert_eq!(second, SendOutcome::RateLimited);

    // WHEN: A third update 5 seconds after the first
    advance(Duration::from_secs(3)).await;
    let (third, frame) = tokio::join!(client.send_activity(activity("C")), daemon.ack_next());

    // THEN: Transmitted, and it is C (B never hit the wire)
    assert_eq!(third, SendOutcome::Accepted);
    assert_eq!(activity_of(&frame)["details"], "C");

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_daemon_rate_limit_reply_when_sending_then_rate_clock_is_not_advanced() {
    // GIVEN: The daemon refuses with 4000
    let (client, mut daemon, _connector) = connected_client().await;
    let (outcome, _) = tokio::join!(
        client.send_activity(activity("A")),
        daemon.reject_next(4000, "rate limited")
    );
    assert_eq!(outcome, SendOutcome::PeerRateLimited);

    // WHEN: Retrying immediately
    let (retry, _) = tokio::join!(client.send_activity(activity("A")), daemon.ack_next());

    // THEN: Not throttled locally
    assert_eq!(retry, SendOutcome::Accepted);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_other_daemon_error_when_sending_then_rejected_with_details() {
    let (client, mut daemon, _connector) = connected_client().await;

    let (outcome, _) = tokio::join!(
        client.send_activity(activity("A")),
        daemon.reject_next(4002, "bad payload")
    );

    assert_eq!(
        outcome,
        SendOutcome::Rejected {
            code: Some(4002),
            message: String::from("bad payload"),
        }
    );
    assert!(client.is_connected());

    client.shutdown().await;
}

/// **VALUE**: A daemon restart must not blank the user's status.
///
/// **BUG THIS CATCHES**: Would catch the cached command being rebuilt (new nonce)
/// instead of resent verbatim, or being sent after a newer caller update.
#[tokio::test(start_paused = true)]
async fn given_accepted_update_when_reconnected_then_cached_payload_replayed_verbatim() {
    // GIVEN: An accepted update on the first connection
    let (client, mut first, connector) = connected_client().await;
    let (outcome, original) =
        tokio::join!(client.send_activity(activity("Dune")), first.ack_next());
    assert_eq!(outcome, SendOutcome::Accepted);

    // WHEN: The link is dropped and a second daemon becomes reachable
    let mut second = connector.expect_connection();
    client.request_reconnect().await;
    second.accept_handshake().await;

    // THEN: The very first frame after READY is the cached command, byte for byte
    let replayed = second.ack_next().await;
    assert_eq!(replayed.opcode, Opcode::Frame);
    assert_eq!(replayed.payload, original.payload);
    assert!(client.wait_until(ConnectionState::Connected).await);

    client.shutdown().await;
}

/// **VALUE**: Clearing is final; a reconnect must not resurrect old activity.
///
/// **BUG THIS CATCHES**: Would catch the replay cache surviving `clear_activity`.
#[tokio::test(start_paused = true)]
async fn given_cleared_activity_when_reconnected_then_nothing_is_replayed() {
    // GIVEN: An accepted update, then a clear
    let (client, mut first, connector) = connected_client().await;
    let (_, _) = tokio::join!(client.send_activity(activity("Dune")), first.ack_next());
    let (cleared, clear_frame) = tokio::join!(client.clear_activity(), first.ack_next());
    assert_eq!(cleared, SendOutcome::Accepted);
    assert!(activity_of(&clear_frame).is_null());

    // WHEN: Reconnecting to a new daemon
    let mut second = connector.expect_connection();
    client.request_reconnect().await;
    second.accept_handshake().await;
    assert!(client.wait_until(ConnectionState::Connected).await);

    // THEN: The next frame is a fresh update, not the stale one
    advance(Duration::from_secs(5)).await;
    let (outcome, frame) = tokio::join!(client.send_activity(activity("Arrival")), second.ack_next());
    assert_eq!(outcome, SendOutcome::Accepted);
    assert_eq!(activity_of(&frame)["details"], "Arrival");

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_clear_while_disconnected_when_reconnected_then_nothing_is_replayed() {
    // GIVEN: An accepted update, then the daemon disappears
    let (client, mut first, connector) = connected_client().await;
    let (_, _) = tokio::join!(client.send_activity(activity("Dune")), first.ack_next());
    client.request_reconnect().await;
    let mut states = client.subscribe();
    states
        .wait_for(|state| *state == ConnectionState::Disconnected)
        .await
        .unwrap();

    // WHEN: Clearing while disconnected, then the daemon comes back
    assert_eq!(client.clear_activity().await, SendOutcome::NotConnected);
    let mut second = connector.expect_connection();
    second.accept_handshake().await;
    assert!(client.wait_until(ConnectionState::Connected).await);

    // THEN: No replay; the next frame is the keepalive
    let next = second.expect_frame().await;
    assert_eq!(next.opcode, Opcode::Ping);

    client.shutdown().await;
}

/// **VALUE**: A clear issued mid-handshake wins over the replay.
///
/// **BUG THIS CATCHES**: Would catch the clear waiting in the queue behind the
/// handshake, letting the stale activity be replayed first and keeping the
/// caller blocked for the whole reconnect.
#[tokio::test(start_paused = true)]
async fn given_clear_during_handshake_when_ready_arrives_then_nothing_is_replayed() {
    // GIVEN: An accepted update, then a reconnect held at the handshake
    let (client, mut first, connector) = connected_client().await;
    let (outcome, _) = tokio::join!(client.send_activity(activity("Dune")), first.ack_next());
    assert_eq!(outcome, SendOutcome::Accepted);

    let mut second = connector.expect_connection();
    client.request_reconnect().await;
    let handshake = second.expect_frame().await;
    assert_eq!(handshake.opcode, Opcode::Handshake);
    assert_eq!(client.state(), ConnectionState::Handshaking);

    // WHEN: Clearing before READY is sent
    let cleared = client.clear_activity().await;
    second.reply_json(ready_event()).await;
    assert!(client.wait_until(ConnectionState::Connected).await);

    // THEN: Answered at once, and the first frame after READY is the keepalive
    assert_eq!(cleared, SendOutcome::NotConnected);
    let next = second.expect_frame().await;
    assert_eq!(next.opcode, Opcode::Ping);

    client.shutdown().await;
}

/// **VALUE**: Replay after a real link failure, ordered ahead of new updates.
///
/// **BUG THIS CATCHES**: Would catch replay only working for requested
/// reconnects, or a caller update overtaking the restored activity.
#[tokio::test(start_paused = true)]
async fn given_daemon_dies_with_cached_activity_when_reconnected_then_replay_precedes_new_update() {
    // GIVEN: An accepted update, then the daemon dies
    let (client, mut first, connector) = connected_client().await;
    let (outcome, original) =
        tokio::join!(client.send_activity(activity("Dune")), first.ack_next());
    assert_eq!(outcome, SendOutcome::Accepted);
    let mut second = connector.expect_connection();
    first.close().await;

    // WHEN: The failed keepalive triggers a reconnect and a caller sends right away
    second.accept_handshake().await;
    assert!(client.wait_until(ConnectionState::Connected).await);
    let (update, (replayed, fresh)) = tokio::join!(
        client.send_activity(activity("Arrival")),
        async {
            let replayed = second.ack_next().await;
            let fresh = second.ack_next().await;
            (replayed, fresh)
        }
    );

    // THEN: Cached command first, byte for byte, then the new update
    assert_eq!(replayed.payload, original.payload);
    assert_eq!(activity_of(&fresh)["details"], "Arrival");
    assert_eq!(update, SendOutcome::Accepted);

    client.shutdown().await;
}

/// **BUG THIS CATCHES**: Would catch the worker never resetting its backoff,
/// so a daemon that restarts once makes every later reconnect slower.
#[tokio::test(start_paused = true)]
async fn given_successful_handshake_when_link_drops_then_backoff_starts_over_at_two_seconds() {
    // GIVEN: Two failed attempts (t=0, t=2), then a daemon for the third (t=6)
    let connector = ScriptedConnector::default();
    let client = start_client(&connector);
    sleep(Duration::from_secs(3)).await;
    let mut daemon = connector.expect_connection();
    daemon.accept_handshake().await;
    assert!(client.wait_until(ConnectionState::Connected).await);

    // WHEN: The link drops and nothing is reachable any more
    client.request_reconnect().await;
    sleep(Duration::from_secs(5)).await;

    // THEN: 2s before the next attempt, not the 8s the old schedule was at
    let gaps: Vec<u64> = connector
        .attempts()
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).as_secs_f64().round() as u64)
        .collect();
    assert_eq!(gaps, vec![2, 4, 2]);

    client.shutdown().await;
}

/// **VALUE**: Pins the reconnect timing against a daemon that never appears.
///
/// **BUG THIS CATCHES**: Would catch a retry loop with no delay (CPU spin) or a
/// schedule that never caps.
#[tokio::test(start_paused = true)]
async fn given_no_daemon_when_retrying_then_attempts_follow_backoff_schedule() {
    // GIVEN: Nothing to connect to
    let connector = ScriptedConnector::default();
    let client = start_client(&connector);

    // WHEN: Letting the worker retry for a while
    sleep(Duration::from_secs(125)).await;

    // THEN: Gaps of 2, 4, 8, 16, 32, 60 seconds
    let attempts = connector.attempts();
    let gaps: Vec<u64> = attempts
        .windows(2)
        .map(|pair| (pair[1] - pair[0]).as_secs_f64().round() as u64)
        .collect();
    assert_eq!(gaps, vec![2, 4, 8, 16, 32, 60]);
    assert_eq!(client.state(), ConnectionState::Disconnected);

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_idle_connection_when_keepalive_due_then_pings_and_stays_connected() {
    // GIVEN
    let (client, mut daemon, _connector) = connected_client().await;

    // WHEN: Nothing happens for the keepalive interval
    let ping = daemon.expect_frame().await;
    daemon.reply(Frame::new(Opcode::Pong, b"{}".to_vec())).await;

    // THEN: A PING went out and the link survives
    assert_eq!(ping.opcode, Opcode::Ping);
    assert_eq!(ping.payload, b"{}");
    let (outcome, _) = tokio::join!(client.send_activity(activity("A")), daemon.ack_next());
    assert_eq!(outcome, SendOutcome::Accepted);
    assert!(client.is_connected());

    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_daemon_gone_when_keepalive_fails_then_reconnects_after_backoff() {
    // GIVEN: A connection whose daemon hangs up
    let (client, first, connector) = connected_client().await;
    let mut second = connector.expect_connection();
    first.close().await;

    // WHEN: The next keepalive hits the dead link
    second.accept_handshake().await;

    // THEN: A second handshake happened and we are connected again
    assert!(client.wait_until(ConnectionState::Connected).await);
    assert_eq!(connector.attempts().len(), 2);

    client.shutdown().await;
}

/// **VALUE**: Shutdown leaves no half-open socket behind.
///
/// **BUG THIS CATCHES**: Would catch the worker exiting without closing the
/// transport, or `shutdown` returning before the worker stopped.
#[tokio::test(start_paused = true)]
async fn given_connected_when_shutdown_then_transport_closed_and_worker_stopped() {
    // GIVEN
    let (client, mut daemon, _connector) = connected_client().await;

    // WHEN
    client.shutdown().await;

    // THEN: The daemon sees end-of-stream and sends are refused
    assert!(daemon.recv().await.is_err());
    assert_eq!(client.state(), ConnectionState::Disconnected);
    assert_eq!(
        client.send_activity(activity("late")).await,
        SendOutcome::NotConnected
    );
    assert_eq!(client.clear_activity().await, SendOutcome::NotConnected);

    // Second shutdown is a no-op
    client.shutdown().await;
}

#[tokio::test(start_paused = true)]
async fn given_peer_close_frame_when_acknowledging_then_failed_and_reconnects() {
    // GIVEN
    let (client, mut first, connector) = connected_client().await;
    let mut second = connector.expect_connection();

    // WHEN: The daemon answers an update with Close
    let (outcome, _) = tokio::join!(client.send_activity(activity("A")), async {
        first.expect_frame().await;
        first
            .reply(
                Frame::json(Opcode::Close, &json!({ "code": 1000, "message": "bye" })).unwrap(),
            )
            .await;
    });

    // THEN: Failed, and the worker reconnects
    assert_eq!(outcome, SendOutcome::Failed);
    second.accept_handshake().await;
    assert!(client.wait_until(ConnectionState::Connected).await);

    client.shutdown().await;
}
