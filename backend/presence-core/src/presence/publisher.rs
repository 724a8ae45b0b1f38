use crate::ipc::SendOutcome;
use crate::presence::sink::ActivitySink;
use crate::presence::tracker::{PresenceAction, PresenceTracker};

use models::PlaybackSnapshot;

use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info, warn};

/// Drives a [`PresenceTracker`] against an [`ActivitySink`].
#[derive(Debug)]
pub struct PresencePublisher<S: ActivitySink> {
    sink: S,
    tracker: PresenceTracker,
}

impl<S: ActivitySink> PresencePublisher<S> {
    pub fn new(sink: S) -> Self {
        Self {
            sink,
            tracker: PresenceTracker::new(),
        }
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    pub fn tracker(&self) -> &PresenceTracker {
        &self.tracker
    }

    /// Apply `snapshot` using the wall clock.
    pub async fn sync(&mut self, snapshot: Option<&PlaybackSnapshot>) -> Option<SendOutcome> {
        self.sync_at(snapshot, unix_now()).await
    }

    /// Apply `snapshot` as observed at `now_unix`.
    ///
    /// Returns the sink's outcome, or `None` when nothing needed sending.
    pub async fn sync_at(
        &mut self,
        snapshot: Option<&PlaybackSnapshot>,
        now_unix: i64,
    ) -> Option<SendOutcome> {
        // A snapshot that cannot become an activity counts as nothing playing,
        // so a stale activity does not linger.
        let action = match self.tracker.evaluate(snapshot, now_unix) {
            Ok(action) => action,
            Err(e) => {
                warn!("Unusable playback snapshot, treating as stopped: {e}");
                self.tracker
                    .evaluate(None, now_unix)
                    .unwrap_or(PresenceAction::Idle)
            }
        };

        match action {
            PresenceAction::Idle => None,
            PresenceAction::Unchanged => {
                debug!("Skipping presence update - no changes detected");
                None
            }
            PresenceAction::Clear => {
                info!("Playback stopped, clearing presence");
                let outcome = self.sink.clear_activity().await;
                self.tracker.mark_cleared();
                Some(outcome)
            }
            PresenceAction::Publish(payload) => {
                let outcome = self.sink.send_activity(payload.clone()).await;
                if outcome.is_accepted() {
                    info!("Presence updated: {} | {}", payload.details(), payload.state());
                    self.tracker.mark_published(&payload);
                } else {
                    debug!("Presence update not applied: {outcome:?}");
                }
                Some(outcome)
            }
        }
    }
}

fn unix_now() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX))
        .unwrap_or(0)
}
