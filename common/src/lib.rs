//! Shared building blocks for the presence bridge.
//!
//! Every error enum in the workspace records where it was raised through
//! [`ErrorLocation`], so log lines point at the exact call site that failed.
//!
//! ## Architecture
//!
//! - **common** (this crate): Cross-cutting helpers with no domain knowledge
//! - **models**: Pure data (playback snapshots, activity payloads)
//! - **presence-core**: Transport, wire codec, connection manager, presence logic
//! - **presence**: Binary wiring everything together

pub mod error;

pub use error::error_location::ErrorLocation;
