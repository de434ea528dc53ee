//! # relay-core
//!
//! Shared types for the relay chat system: the JSON wire events
//! exchanged over the websocket and the common error type used by
//! both the server and the probe client.

pub mod error;
pub mod message;

pub use error::{RelayError, RelayResult};
pub use message::{ClientEvent, ServerEvent, UserSummary};

/// Path the server accepts websocket upgrades on.
pub const CHAT_PATH: &str = "/chat";
