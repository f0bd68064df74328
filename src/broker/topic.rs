//! Topic membership
//!
//! A `Topic` maps each subscribed session to the producing side of that
//! session's outbound queue. The hub task is the only owner of topics, so no
//! synchronization is needed here.

use std::collections::HashMap;
use std::fmt;

use axum::extract::ws::Message as WsMessage;
use tokio::sync::mpsc;
use uuid::Uuid;

/// Sending half of a session's bounded outbound queue.
pub type Outbound = mpsc::Sender<WsMessage>;

/// Unique identifier of one live session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(format!("session-{}", Uuid::new_v4()))
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Default)]
pub struct Topic {
    pub name: String,
    pub subscribers: HashMap<SessionId, Outbound>,
}

impl Topic {
    /// Create a new topic with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            subscribers: HashMap::new(),
        }
    }

    /// Add a subscriber. Returns the previous sender if the id was already present.
    pub fn subscribe(&mut self, id: SessionId, sender: Outbound) -> Option<Outbound> {
        self.subscribers.insert(id, sender)
    }

    /// Remove a subscriber, handing back its sender.
    pub fn unsubscribe(&mut self, id: &SessionId) -> Option<Outbound> {
        self.subscribers.remove(id)
    }

    pub fn is_empty(&self) -> bool {
        self.subscribers.is_empty()
    }
}
