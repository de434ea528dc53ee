//! Connected-user registry and event routing.
//!
//! The hub owns the map of live sessions. Sessions hand it inbound
//! client events under a lock; outbound events travel to each session
//! over its unbounded channel, so no await happens while the lock is
//! held.

use std::collections::HashMap;
use tokio::sync::mpsc::UnboundedSender;

use relay_core::{ClientEvent, ServerEvent, UserSummary};

/// A connected user.
#[derive(Debug)]
pub struct User {
    pub id: usize,
    pub key: Option<String>,
    tx: UnboundedSender<ServerEvent>,
}

impl User {
    fn new(id: usize, tx: UnboundedSender<ServerEvent>) -> Self {
        Self { id, key: None, tx }
    }

    /// A user is in the roster once it has published a key.
    fn is_registered(&self) -> bool {
        self.key.is_some()
    }

    fn summary(&self) -> Option<UserSummary> {
        self.key.as_ref().map(|key| UserSummary {
            id: self.id,
            key: key.clone(),
        })
    }

    fn send(&self, event: ServerEvent) -> bool {
        self.tx.send(event).is_ok()
    }
}

/// Registry of live sessions.
#[derive(Debug, Default)]
pub struct Hub {
    sessions: HashMap<usize, User>,
}

impl Hub {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a new session and tell it its id.
    pub fn connect(&mut self, id: usize, tx: UnboundedSender<ServerEvent>) {
        tracing::info!(id, "session connected");
        let user = User::new(id, tx);
        user.send(ServerEvent::YourId(id));
        self.sessions.insert(id, user);
    }

    /// Remove a session and announce the departure to the roster.
    pub fn disconnect(&mut self, id: usize) {
        tracing::info!(id, "session disconnected");
        if let Some(user) = self.sessions.remove(&id) {
            if let Some(summary) = user.summary() {
                self.broadcast(ServerEvent::UserOut(summary));
            }
        }
    }

    /// Route one inbound event from session `from`.
    pub fn handle_event(&mut self, from: usize, event: ClientEvent) {
        tracing::debug!(from, ?event, "client event");
        match event {
            ClientEvent::GetUsersIds { start, count } => self.get_users(from, start, count),
            ClientEvent::PublicKey(key) => self.set_key(from, key),
            ClientEvent::Message {
                to,
                message,
                random_id,
            } => self.relay_message(from, to, message, random_id),
        }
    }

    /// Reply with a page of the roster. Unkeyed users are skipped.
    fn get_users(&self, to: usize, start: usize, count: usize) {
        let users: Vec<UserSummary> = self
            .sessions
            .values()
            .filter_map(User::summary)
            .skip(start)
            .take(count)
            .collect();

        if let Some(user) = self.sessions.get(&to) {
            user.send(ServerEvent::Users(users));
        }
    }

    /// Store a freshly published key, announce the join to everyone in
    /// the roster and send the existing roster to the newcomer.
    fn set_key(&mut self, id: usize, key: String) {
        let joined = match self.sessions.get_mut(&id) {
            Some(user) => {
                user.key = Some(key);
                user.summary().expect("key was just set")
            }
            None => return,
        };

        let newcomer_tx = self.sessions[&id].tx.clone();
        for user in self.sessions.values().filter(|u| u.is_registered()) {
            user.send(ServerEvent::UserIn(joined.clone()));
            if user.id != id {
                if let Some(summary) = user.summary() {
                    let _ = newcomer_tx.send(ServerEvent::UserIn(summary));
                }
            }
        }
    }

    /// Forward a message and send the delivery receipt to the sender.
    fn relay_message(&self, from: usize, to: usize, message: String, random_id: usize) {
        let delivered = self
            .sessions
            .get(&to)
            .map(|user| {
                user.send(ServerEvent::Message {
                    from,
                    message,
                    random_id,
                })
            })
            .unwrap_or(false);

        if let Some(sender) = self.sessions.get(&from) {
            sender.send(ServerEvent::MessageStatus {
                random_id,
                delivered,
            });
        }
    }

    fn broadcast(&self, event: ServerEvent) {
        for user in self.sessions.values().filter(|u| u.is_registered()) {
            user.send(event.clone());
        }
    }
}
