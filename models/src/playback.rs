//! Playback snapshots reported by the media server poller.

use serde::{Deserialize, Serialize};

const STATE_PLAYING: &str = "playing";
const STATE_PAUSED: &str = "paused";

/// Playback status derived from a snapshot's state label.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackStatus {
    Playing,
    Paused,
    /// Anything else the server reports ("stopped", "buffering", empty).
    Stopped,
}

/// One observation of what the user is currently watching.
///
/// Produced by the playback source collaborator every poll. Missing fields
/// deserialize to their defaults so a partial record degrades to "stopped".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaybackSnapshot {
    pub is_playing: bool,
    /// Human-readable media kind ("Movie", "TV Show", "Music").
    pub media_type: String,
    pub title: String,
    /// Show name for episodes, artist for tracks, empty for movies.
    pub subtitle: String,
    /// Raw player state: "playing", "paused", or something else.
    #[serde(alias = "state")]
    pub state_label: String,
    #[serde(alias = "progress")]
    pub progress_seconds: i64,
    #[serde(alias = "duration")]
    pub duration_seconds: i64,
}

impl PlaybackSnapshot {
    pub fn status(&self) -> PlaybackStatus {
        match self.state_label.as_str() {
            STATE_PLAYING => PlaybackStatus::Playing,
            STATE_PAUSED => PlaybackStatus::Paused,
            _ => PlaybackStatus::Stopped,
        }
    }

    /// Seconds left until the end of the item, if the numbers make sense.
    pub fn remaining_seconds(&self) -> Option<i64> {
        if self.duration_seconds > 0 && self.progress_seconds >= 0 {
            Some(self.duration_seconds - self.progress_seconds)
        } else {
            None
        }
    }
}
