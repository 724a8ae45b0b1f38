//! Domain models for the presence bridge.
//!
//! This crate contains pure data structures: what the media server reports
//! is playing, and what gets displayed on the chat client. Models have no
//! I/O and no timing logic - they're just data passed between layers.
//!
//! ## Architecture
//!
//! - **models** (this crate): Pure data structures
//! - **presence-core**: Connection manager and presence logic operating on models
//! - **presence**: Binary wiring everything together

pub mod activity;
pub mod error;
pub mod playback;

pub use activity::builder::ActivityPayloadBuilder;
pub use activity::{ActivityAssets, ActivityPayload, ActivityTimestamps, truncate_field};
pub use error::model_error::ModelError;
pub use playback::{PlaybackSnapshot, PlaybackStatus};
