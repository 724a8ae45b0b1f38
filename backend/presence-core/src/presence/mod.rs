//! Turning playback snapshots into presence updates.
//!
//! [`PresenceTracker`] decides; [`PresencePublisher`] acts. The tracker only
//! remembers what the daemon last accepted, so an update that was dropped or
//! rate limited is simply retried on the next poll.

mod publisher;
mod sink;
mod source;
mod tracker;

pub use publisher::PresencePublisher;
pub use sink::ActivitySink;
pub use source::PlaybackSource;
pub use tracker::{PresenceAction, PresenceTracker};
