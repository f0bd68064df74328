//! Hub task
//!
//! The hub serializes every registration, de-registration and broadcast
//! through one command channel. `Hub::run` owns the `Broker`; everything else
//! talks to it through a cloneable `HubHandle`.

use axum::extract::ws::Message as WsMessage;
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info};

use crate::broker::engine::Broker;
use crate::broker::topic::{Outbound, SessionId};
use crate::utils::error::RelayError;

#[derive(Debug)]
pub enum Command {
    Register {
        topic: String,
        session: SessionId,
        sender: Outbound,
    },
    Unregister {
        topic: String,
        session: SessionId,
    },
    Broadcast {
        topic: String,
        message: WsMessage,
    },
    SubscriberCount {
        topic: String,
        reply: oneshot::Sender<usize>,
    },
}

/// The coordination task. Consumed by `run`, so it can only be started once.
#[derive(Debug)]
pub struct Hub {
    broker: Broker,
    commands: mpsc::Receiver<Command>,
}

/// Submission side of the hub, shared by the HTTP adapters and sessions.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<Command>,
}

impl Hub {
    pub fn new(capacity: usize) -> (Hub, HubHandle) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let hub = Hub {
            broker: Broker::new(),
            commands: rx,
        };
        (hub, HubHandle { commands: tx })
    }

    /// Processes commands until every `HubHandle` has been dropped.
    pub async fn run(mut self) {
        info!("hub started");
        while let Some(command) = self.commands.recv().await {
            self.apply(command);
        }
        info!("hub stopped: all handles dropped");
    }

    fn apply(&mut self, command: Command) {
        match command {
            Command::Register {
                topic,
                session,
                sender,
            } => {
                self.broker.register(&topic, session.clone(), sender);
                debug!(
                    "{session} registered on {topic} ({} subscribers)",
                    self.broker.subscriber_count(&topic)
                );
            }
            Command::Unregister { topic, session } => {
                if self.broker.unregister(&topic, &session) {
                    debug!("{session} unregistered from {topic}");
                }
            }
            Command::Broadcast { topic, message } => {
                let delivery = self.broker.broadcast(&topic, &message);
                debug!(
                    "broadcast on {topic}: delivered={} evicted={}",
                    delivery.delivered,
                    delivery.evicted.len()
                );
            }
            Command::SubscriberCount { topic, reply } => {
                let _ = reply.send(self.broker.subscriber_count(&topic));
            }
        }
    }
}

impl HubHandle {
    async fn submit(&self, command: Command) -> Result<(), RelayError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| RelayError::HubClosed)
    }

    pub async fn register(
        &self,
        topic: &str,
        session: SessionId,
        sender: Outbound,
    ) -> Result<(), RelayError> {
        self.submit(Command::Register {
            topic: topic.to_string(),
            session,
            sender,
        })
        .await
    }

    pub async fn unregister(&self, topic: &str, session: &SessionId) -> Result<(), RelayError> {
        self.submit(Command::Unregister {
            topic: topic.to_string(),
            session: session.clone(),
        })
        .await
    }

    pub async fn broadcast(&self, topic: &str, message: WsMessage) -> Result<(), RelayError> {
        self.submit(Command::Broadcast {
            topic: topic.to_string(),
            message,
        })
        .await
    }

    /// Number of sessions currently registered under `topic`.
    pub async fn subscriber_count(&self, topic: &str) -> Result<usize, RelayError> {
        let (reply, rx) = oneshot::channel();
        self.submit(Command::SubscriberCount {
            topic: topic.to_string(),
            reply,
        })
        .await?;
        rx.await.map_err(|_| RelayError::HubClosed)
    }
}
