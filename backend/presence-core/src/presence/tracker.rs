//! Snapshot to activity diffing.

use models::{ActivityPayload, ActivityPayloadBuilder, ModelError, PlaybackSnapshot, PlaybackStatus};

const PAUSED_SUFFIX: &str = " (Paused)";
const SUBTITLE_SEPARATOR: &str = " - ";

/// What the publisher should do with the latest snapshot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PresenceAction {
    /// Nothing playing, and nothing shown.
    Idle,
    /// Same `(details, state, end)` as the last accepted update.
    Unchanged,
    /// Playback stopped after something was shown.
    Clear,
    Publish(ActivityPayload),
}

/// `(details, state, end timestamp)` of the last accepted update.
type Shown = (String, String, Option<i64>);

/// Remembers what was last shown and decides what to do next.
///
/// Pure: no I/O and no clock. The caller passes the current unix time and
/// reports back which actions the daemon accepted.
#[derive(Debug, Clone, Default)]
pub struct PresenceTracker {
    shown: Option<Shown>,
}

impl PresenceTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True once an update was accepted and not cleared since.
    pub fn is_showing(&self) -> bool {
        self.shown.is_some()
    }

    /// Decide the action for `snapshot` observed at `now_unix` seconds.
    ///
    /// `None` means nothing is playing.
    ///
    /// # Errors
    ///
    /// Returns [`ModelError::Validation`] when a playing snapshot has no title.
    pub fn evaluate(
        &self,
        snapshot: Option<&PlaybackSnapshot>,
        now_unix: i64,
    ) -> Result<PresenceAction, ModelError> {
        let Some(snapshot) = snapshot else {
            return Ok(self.stopped());
        };

        let status = snapshot.status();
        if status == PlaybackStatus::Stopped {
            return Ok(self.stopped());
        }

        let payload = build_payload(snapshot, status, now_unix)?;
        if self.shown.as_ref() == Some(&shown_of(&payload)) {
            return Ok(PresenceAction::Unchanged);
        }

        Ok(PresenceAction::Publish(payload))
    }

    /// Record that the daemon accepted `payload`.
    pub fn mark_published(&mut self, payload: &ActivityPayload) {
        self.shown = Some(shown_of(payload));
    }

    /// Record that a clear was issued, whatever its outcome.
    pub fn mark_cleared(&mut self) {
        self.shown = None;
    }

    fn stopped(&self) -> PresenceAction {
        if self.is_showing() {
            PresenceAction::Clear
        } else {
            PresenceAction::Idle
        }
    }
}

fn build_payload(
    snapshot: &PlaybackSnapshot,
    status: PlaybackStatus,
    now_unix: i64,
) -> Result<ActivityPayload, ModelError> {
    let mut details = snapshot.title.clone();
    if !snapshot.subtitle.is_empty() {
        details.push_str(SUBTITLE_SEPARATOR);
        details.push_str(&snapshot.subtitle);
    }

    let mut state = snapshot.media_type.clone();
    if status == PlaybackStatus::Paused {
        state.push_str(PAUSED_SUFFIX);
    }

    // Paused items show no countdown; an end past i64 shows none either.
    let end = match status {
        PlaybackStatus::Playing => snapshot
            .remaining_seconds()
            .and_then(|remaining| now_unix.checked_add(remaining))
            .filter(|end| *end > 0),
        _ => None,
    };

    ActivityPayloadBuilder::default()
        .with_details(details)
        .with_state(state)
        .with_end_timestamp(end)
        .build()
}

fn shown_of(payload: &ActivityPayload) -> Shown {
    (
        payload.details().to_string(),
        payload.state().to_string(),
        payload.end_timestamp(),
    )
}
