//! Broker engine
//!
//! The in-memory registry of topic membership and the fan-out step of a
//! broadcast. The API is synchronous and is driven by exactly one task, the
//! hub loop in `hub.rs`; nothing else ever touches a `Broker`.
//!
//! Fan-out never waits on a subscriber. A subscriber whose queue is full is
//! treated as unresponsive and evicted: it is removed from the topic and its
//! sender is dropped, which its write duty sees as a closed queue.

use std::collections::HashMap;

use axum::extract::ws::Message as WsMessage;
use tokio::sync::mpsc::error::TrySendError;
use tracing::{debug, warn};

use crate::broker::topic::{Outbound, SessionId, Topic};

/// Outcome of one broadcast, used for logging and tests.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub delivered: usize,
    pub evicted: Vec<SessionId>,
}

#[derive(Debug, Default)]
pub struct Broker {
    pub topics: HashMap<String, Topic>,
}

impl Broker {
    pub fn new() -> Self {
        Self {
            topics: HashMap::new(),
        }
    }

    /// Adds a session to a topic, creating the topic on first use.
    pub fn register(&mut self, topic: &str, session: SessionId, sender: Outbound) {
        let entry = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| Topic::new(topic));

        if entry.subscribe(session.clone(), sender).is_some() {
            warn!("{session} registered twice on topic {topic}; keeping the newest queue");
        }
    }

    /// Removes a session from a topic. Absent sessions and topics are a no-op.
    ///
    /// The removed sender is dropped here, closing the session's queue.
    pub fn unregister(&mut self, topic: &str, session: &SessionId) -> bool {
        let Some(entry) = self.topics.get_mut(topic) else {
            return false;
        };

        let removed = entry.unsubscribe(session).is_some();
        if entry.is_empty() {
            debug!("topic {} has no subscribers left, pruning", entry.name);
            self.topics.remove(topic);
        }
        removed
    }

    /// Enqueues `message` on every subscriber of `topic` without blocking.
    pub fn broadcast(&mut self, topic: &str, message: &WsMessage) -> Delivery {
        let mut delivery = Delivery::default();

        let Some(entry) = self.topics.get_mut(topic) else {
            debug!("no subscribers on topic {topic}");
            return delivery;
        };

        for (session, sender) in &entry.subscribers {
            match sender.try_send(message.clone()) {
                Ok(()) => delivery.delivered += 1,
                Err(TrySendError::Full(_)) => {
                    warn!("outbound queue full for {session}, evicting from topic {topic}");
                    delivery.evicted.push(session.clone());
                }
                Err(TrySendError::Closed(_)) => {
                    debug!("outbound queue closed for {session}, removing from topic {topic}");
                    delivery.evicted.push(session.clone());
                }
            }
        }

        for session in &delivery.evicted {
            entry.unsubscribe(session);
        }
        if entry.is_empty() {
            debug!("topic {} has no subscribers left, pruning", entry.name);
            self.topics.remove(topic);
        }

        delivery
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|t| t.subscribers.len())
            .unwrap_or(0)
    }
}
