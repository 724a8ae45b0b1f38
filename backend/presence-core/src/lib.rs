//! Rich-presence bridge core.
//!
//! Connects to the chat client's local IPC endpoint, keeps the connection
//! alive across daemon restarts, and turns playback snapshots into rate
//! limited, de-duplicated activity updates.
//!
//! - [`transport`]: endpoint discovery and the raw byte stream
//! - [`ipc`]: frame codec, wire messages, and the connection worker
//! - [`presence`]: snapshot diffing and publishing
//! - [`config`]: explicit runtime configuration

pub mod config;
pub mod error;
pub mod ipc;
pub mod presence;
pub mod transport;
