//! Sessions
//!
//! A session is one subscriber socket bound to one topic for its whole life.
//! It runs two duties concurrently: the read duty (`pump::read_pump`) drains
//! inbound frames into the hub, and the write duty (`pump::write_pump`)
//! drains the outbound queue to the socket and sends keepalive pings.
//!
//! The read duty owns teardown. When it ends, `run` unregisters the session,
//! which closes the outbound queue and lets the write duty finish.

pub mod pump;

use std::time::Duration;

use axum::extract::ws::WebSocket;
use futures_util::StreamExt;
use tokio::sync::{mpsc, oneshot};
use tracing::{info, warn};

use crate::broker::{HubHandle, SessionId};
use crate::config::RelaySettings;

pub use pump::{read_pump, write_pump};

/// Why a session duty stopped.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Disconnect {
    #[error("peer sent a close frame")]
    PeerClosed,
    #[error("socket stream ended")]
    StreamEnded,
    #[error("no frame or pong within the inactivity window")]
    Timeout,
    #[error("inbound frame of {0} bytes exceeds the limit")]
    FrameTooLarge(usize),
    #[error("transport error: {0}")]
    Transport(String),
    #[error("write timed out")]
    WriteTimeout,
    #[error("outbound queue closed")]
    QueueClosed,
    #[error("write duty exited")]
    WriterClosed,
    #[error("hub is not running")]
    HubClosed,
}

/// Framing, keepalive and queueing limits applied to every session.
#[derive(Debug, Clone)]
pub struct SessionLimits {
    pub queue_capacity: usize,
    pub max_frame_size: usize,
    pub pong_wait: Duration,
    pub write_wait: Duration,
}

impl SessionLimits {
    /// Keepalive period: 90% of the inactivity window, so a ping always
    /// lands before the peer's deadline.
    pub fn ping_period(&self) -> Duration {
        self.pong_wait * 9 / 10
    }
}

impl Default for SessionLimits {
    fn default() -> Self {
        Self {
            queue_capacity: 256,
            max_frame_size: 512,
            pong_wait: Duration::from_secs(60),
            write_wait: Duration::from_secs(10),
        }
    }
}

impl From<&RelaySettings> for SessionLimits {
    fn from(settings: &RelaySettings) -> Self {
        Self {
            queue_capacity: settings.queue_capacity.max(1),
            max_frame_size: settings.max_frame_size,
            pong_wait: settings.pong_wait(),
            write_wait: settings.write_wait(),
        }
    }
}

/// A live subscriber. The topic is fixed at construction.
#[derive(Debug, Clone)]
pub struct Session {
    id: SessionId,
    topic: String,
}

impl Session {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            id: SessionId::new(),
            topic: topic.into(),
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }
}

/// Drives one upgraded socket from registration to teardown.
pub async fn run(socket: WebSocket, topic: String, hub: HubHandle, limits: SessionLimits) {
    let session = Session::new(topic);
    let (tx, rx) = mpsc::channel(limits.queue_capacity);

    if let Err(e) = hub.register(session.topic(), session.id().clone(), tx).await {
        warn!("{} could not register on {}: {e}", session.id(), session.topic());
        return;
    }
    info!("{} connected to topic {}", session.id(), session.topic());

    let (sink, stream) = socket.split();
    let (done_tx, done_rx) = oneshot::channel::<()>();

    let mut writer = {
        let limits = limits.clone();
        let id = session.id().clone();
        tokio::spawn(async move {
            let reason = write_pump(sink, rx, &limits, &id).await;
            drop(done_tx);
            reason
        })
    };

    let reason = read_pump(stream, &session, &hub, &limits, done_rx).await;

    if let Err(e) = hub.unregister(session.topic(), session.id()).await {
        warn!("{} could not unregister: {e}", session.id());
    }

    match tokio::time::timeout(limits.write_wait, &mut writer).await {
        Ok(Ok(write_reason)) => {
            info!(
                "{} disconnected from {} (read: {reason}, write: {write_reason})",
                session.id(),
                session.topic()
            );
        }
        Ok(Err(e)) => warn!("{} write duty failed: {e}", session.id()),
        Err(_) => {
            writer.abort();
            warn!(
                "{} write duty still busy after teardown, aborted (read: {reason})",
                session.id()
            );
        }
    }
}
