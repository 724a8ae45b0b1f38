use crate::presence::{PresenceAction, PresenceTracker};

use models::{ModelError, PlaybackSnapshot};

const NOW: i64 = 1_700_000_000;

fn snapshot(state: &str) -> PlaybackSnapshot {
    PlaybackSnapshot {
        is_playing: state == "playing",
        media_type: String::from("TV Show"),
        title: String::from("Severance"),
        subtitle: String::from("Hello, Ms. Cobel"),
        state_label: String::from(state),
        progress_seconds: 600,
        duration_seconds: 3000,
    }
}

fn published(action: PresenceAction) -> models::ActivityPayload {
    match action {
        PresenceAction::Publish(payload) => payload,
        other => panic!("Expected Publish, got {other:?}"),
    }
}

#[test]
fn given_playing_snapshot_when_evaluated_then_publishes_with_end_time() {
    // GIVEN
    let tracker = PresenceTracker::new();

    // WHEN
    let payload = published(tracker.evaluate(Some(&snapshot("playing")), NOW).unwrap());

    // THEN: Title joined with subtitle, countdown to the end
    assert_eq!(payload.details(), "Severance - Hello, Ms. Cobel");
    assert_eq!(payload.state(), "TV Show");
    assert_eq!(payload.end_timestamp(), Some(NOW + 2400));
}

#[test]
fn given_paused_snapshot_when_evaluated_then_marks_paused_without_end_time() {
    let tracker = PresenceTracker::new();

    let payload = published(tracker.evaluate(Some(&snapshot("paused")), NOW).unwrap());

    assert_eq!(payload.state(), "TV Show (Paused)");
    assert_eq!(payload.end_timestamp(), None);
}

#[test]
fn given_no_subtitle_or_duration_when_evaluated_then_title_only_and_no_end() {
    // GIVEN: A movie whose duration is unknown
    let movie = PlaybackSnapshot {
        subtitle: String::new(),
        media_type: String::from("Movie"),
        duration_seconds: 0,
        ..snapshot("playing")
    };

    // WHEN
    let payload = published(PresenceTracker::new().evaluate(Some(&movie), NOW).unwrap());

    // THEN
    assert_eq!(payload.details(), "Severance");
    assert_eq!(payload.end_timestamp(), None);
}

/// **VALUE**: Polling the same state must not spam the daemon.
///
/// **BUG THIS CATCHES**: Would catch the comparison ignoring the end time, or
/// comparing before truncation.
#[test]
fn given_published_state_when_same_snapshot_evaluated_then_unchanged() {
    // GIVEN: An accepted update
    let mut tracker = PresenceTracker::new();
    let payload = published(tracker.evaluate(Some(&snapshot("playing")), NOW).unwrap());
    tracker.mark_published(&payload);

    // WHEN: The same snapshot at the same instant
    let again = tracker.evaluate(Some(&snapshot("playing")), NOW).unwrap();

    // THEN
    assert_eq!(again, PresenceAction::Unchanged);
}

#[test]
fn given_published_state_when_seek_moves_end_time_then_publishes_again() {
    let mut tracker = PresenceTracker::new();
    let payload = published(tracker.evaluate(Some(&snapshot("playing")), NOW).unwrap());
    tracker.mark_published(&payload);

    let seeked = PlaybackSnapshot {
        progress_seconds: 1200,
        ..snapshot("playing")
    };
    let moved = published(tracker.evaluate(Some(&seeked), NOW).unwrap());

    assert_eq!(moved.end_timestamp(), Some(NOW + 1800));
}

#[test]
fn given_unaccepted_update_when_same_snapshot_evaluated_then_publishes_again() {
    // GIVEN: An update that was never marked as published
    let tracker = PresenceTracker::new();
    let _ = tracker.evaluate(Some(&snapshot("playing")), NOW).unwrap();

    // WHEN/THEN: Retried next time
    assert!(matches!(
        tracker.evaluate(Some(&snapshot("playing")), NOW).unwrap(),
        PresenceAction::Publish(_)
    ));
}

#[test]
fn given_showing_when_playback_stops_then_clear_once() {
    // GIVEN: Something is shown
    let mut tracker = PresenceTracker::new();
    let payload = published(tracker.evaluate(Some(&snapshot("playing")), NOW).unwrap());
    tracker.mark_published(&payload);

    // WHEN: The server reports "stopped", then nothing at all
    let first = tracker.evaluate(Some(&snapshot("stopped")), NOW).unwrap();
    tracker.mark_cleared();
    let second = tracker.evaluate(None, NOW).unwrap();

    // THEN
    assert_eq!(first, PresenceAction::Clear);
    assert_eq!(second, PresenceAction::Idle);
    assert!(!tracker.is_showing());
}

#[test]
fn given_nothing_shown_when_nothing_playing_then_idle() {
    let tracker = PresenceTracker::new();

    assert_eq!(tracker.evaluate(None, NOW).unwrap(), PresenceAction::Idle);
    assert_eq!(
        tracker.evaluate(Some(&snapshot("buffering")), NOW).unwrap(),
        PresenceAction::Idle
    );
}

/// **BUG THIS CATCHES**: Would catch fields going out untruncated, which the
/// daemon rejects.
#[test]
fn given_200_char_title_when_evaluated_then_details_truncated_with_ellipsis() {
    let long = PlaybackSnapshot {
        title: "x".repeat(200),
        subtitle: String::new(),
        ..snapshot("playing")
    };

    let payload = published(PresenceTracker::new().evaluate(Some(&long), NOW).unwrap());

    assert_eq!(payload.details(), format!("{}…", "x".repeat(125)));
}

#[test]
fn given_playing_without_title_when_evaluated_then_validation_error() {
    let untitled = PlaybackSnapshot {
        title: String::new(),
        subtitle: String::new(),
        ..snapshot("playing")
    };

    assert!(matches!(
        PresenceTracker::new().evaluate(Some(&untitled), NOW),
        Err(ModelError::Validation { .. })
    ));
}

/// **VALUE**: Snapshots come from untrusted input; absurd numbers must not
/// take the poll loop down.
///
/// **BUG THIS CATCHES**: Would catch the end time being computed with an
/// unchecked add that panics (debug) or wraps (release).
#[test]
fn given_huge_duration_when_evaluated_then_publishes_without_end_time() {
    // GIVEN: A duration that overflows once added to the clock
    let endless = PlaybackSnapshot {
        progress_seconds: 0,
        duration_seconds: i64::MAX,
        ..snapshot("playing")
    };

    // WHEN
    let payload = published(PresenceTracker::new().evaluate(Some(&endless), NOW).unwrap());

    // THEN: Still published, just without a countdown
    assert_eq!(payload.details(), "Severance - Hello, Ms. Cobel");
    assert_eq!(payload.end_timestamp(), None);
}
