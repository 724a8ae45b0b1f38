//! Activity payloads: what the chat client displays for the current user.

pub mod builder;

use serde::Serialize;

/// Longest text the chat client accepts for `details` and `state`.
pub const MAX_FIELD_CHARS: usize = 128;

/// Characters kept before the ellipsis when a field is too long.
const TRUNCATED_PREFIX_CHARS: usize = MAX_FIELD_CHARS - 3;

const ELLIPSIS: char = '…';

pub const LARGE_IMAGE_KEY: &str = "plex_logo";
pub const LARGE_IMAGE_TEXT: &str = "Watching on Plex";

/// Art shown next to the activity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityAssets {
    pub large_image: String,
    pub large_text: String,
}

impl Default for ActivityAssets {
    fn default() -> Self {
        Self {
            large_image: LARGE_IMAGE_KEY.to_string(),
            large_text: LARGE_IMAGE_TEXT.to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ActivityTimestamps {
    /// Unix seconds at which playback is expected to finish.
    pub end: i64,
}

/// Immutable activity descriptor, built through [`ActivityPayloadBuilder`].
///
/// Serializes to the exact `activity` object of a `SET_ACTIVITY` command;
/// `timestamps` is omitted entirely when there is no end time.
///
/// [`ActivityPayloadBuilder`]: builder::ActivityPayloadBuilder
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityPayload {
    details: String,
    state: String,
    assets: ActivityAssets,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamps: Option<ActivityTimestamps>,
}

impl ActivityPayload {
    pub fn details(&self) -> &str {
        &self.details
    }

    pub fn state(&self) -> &str {
        &self.state
    }

    pub fn assets(&self) -> &ActivityAssets {
        &self.assets
    }

    pub fn end_timestamp(&self) -> Option<i64> {
        self.timestamps.map(|t| t.end)
    }
}

/// Clamp `text` to [`MAX_FIELD_CHARS`] characters.
///
/// Over-long text keeps its first 125 characters followed by a single `…`,
/// so the result is 126 characters long. Counts chars, not bytes.
pub fn truncate_field(text: &str) -> String {
    if text.chars().count() <= MAX_FIELD_CHARS {
        return text.to_string();
    }

    let mut truncated: String = text.chars().take(TRUNCATED_PREFIX_CHARS).collect();
    truncated.push(ELLIPSIS);
    truncated
}
