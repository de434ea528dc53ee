//! Wire events for the relay protocol.
//!
//! Events are externally tagged JSON objects keyed by the variant
//! name. A `GetUsersIds` request with `start = 0` and `count = 5`
//! serializes to `{"GetUsersIds":{"start":0,"count":5}}`.

use serde::{Deserialize, Serialize};

/// Public view of a registered user. A user appears in the roster
/// only after publishing a public key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: usize,
    pub key: String,
}

/// Events sent by a client to the server.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientEvent {
    /// Page through the roster of registered users.
    GetUsersIds { start: usize, count: usize },
    /// Publish this client's public key and join the roster.
    PublicKey(String),
    /// Relay an opaque message to another user. `random_id` is the
    /// sender's correlation token for the delivery receipt.
    Message {
        to: usize,
        message: String,
        random_id: usize,
    },
}

/// Events sent by the server to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ServerEvent {
    /// The id assigned to this connection. First event on every
    /// connection.
    YourId(usize),
    /// Reply to [`ClientEvent::GetUsersIds`].
    Users(Vec<UserSummary>),
    /// A message relayed from another user.
    Message {
        from: usize,
        message: String,
        random_id: usize,
    },
    /// Delivery receipt for a relayed message.
    MessageStatus { random_id: usize, delivered: bool },
    /// A user joined the roster.
    UserIn(UserSummary),
    /// A user left.
    UserOut(UserSummary),
}
