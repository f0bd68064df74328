//! HTTP surface of the relay.
//!
//! `POST /{topic}` publishes a canonicalized envelope to the topic's current
//! subscribers. `GET /{topic}` with an upgrade handshake subscribes a socket
//! to the topic and runs its session until it disconnects.

use std::net::SocketAddr;

use axum::Router;
use axum::body::Bytes;
use axum::extract::ws::{Message as WsMessage, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::get;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::{debug, error, info, warn};

use crate::broker::{Hub, HubHandle};
use crate::config::Settings;
use crate::session::{self, SessionLimits};
use crate::transport::envelope::{canonicalize, is_valid_topic};
use crate::utils::error::RelayError;

/// Shared state handed to every handler.
#[derive(Debug, Clone)]
pub struct AppState {
    pub hub: HubHandle,
    pub limits: SessionLimits,
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/{topic}", get(subscribe).post(publish))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

async fn publish(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    body: Bytes,
) -> Result<StatusCode, RelayError> {
    if !is_valid_topic(&topic) {
        return Err(RelayError::InvalidTopic(topic));
    }
    let canonical = canonicalize(&body)?;

    debug!("publishing {} bytes to {topic}", canonical.len());
    state
        .hub
        .broadcast(&topic, WsMessage::Text(canonical.into()))
        .await?;
    Ok(StatusCode::OK)
}

async fn subscribe(
    State(state): State<AppState>,
    Path(topic): Path<String>,
    ws: WebSocketUpgrade,
) -> Response {
    let limits = state.limits.clone();

    ws.max_message_size(limits.max_frame_size)
        .max_frame_size(limits.max_frame_size)
        .on_failed_upgrade(|e| warn!("websocket upgrade failed: {e}"))
        .on_upgrade(move |socket| async move {
            if !is_valid_topic(&topic) {
                debug!("closing socket subscribed to invalid topic {topic:?}");
                drop(socket);
                return;
            }
            session::run(socket, topic, state.hub, limits).await;
        })
}

/// A running relay: the hub task plus the HTTP server.
#[derive(Debug)]
pub struct ServerHandle {
    pub addr: SocketAddr,
    pub hub: HubHandle,
    server: JoinHandle<()>,
    hub_task: JoinHandle<()>,
}

impl ServerHandle {
    /// Resolves when the HTTP server stops.
    pub async fn wait(&mut self) {
        let _ = (&mut self.server).await;
    }

    pub fn shutdown(self) {
        self.server.abort();
        self.hub_task.abort();
    }
}

/// Binds `addr`, starts the hub, and serves the router in the background.
pub async fn start(settings: &Settings, addr: &str) -> Result<ServerHandle, RelayError> {
    settings.validate()?;
    let listener = TcpListener::bind(addr).await?;
    let local_addr = listener.local_addr()?;

    let (hub, handle) = Hub::new(settings.relay.hub_capacity);
    let hub_task = tokio::spawn(hub.run());

    let router = build_router(AppState {
        hub: handle.clone(),
        limits: SessionLimits::from(&settings.relay),
    });

    info!("relay listening on {local_addr}");
    let server = tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, router).await {
            error!("HTTP server failed: {e}");
        }
    });

    Ok(ServerHandle {
        addr: local_addr,
        hub: handle,
        server,
        hub_task,
    })
}

/// Runs the relay on `addr` until ctrl-c.
pub async fn serve(settings: Settings, addr: &str) -> Result<(), RelayError> {
    let mut server = start(&settings, addr).await?;

    tokio::select! {
        _ = server.wait() => {
            error!("HTTP server exited unexpectedly.");
        }
        _ = tokio::signal::ctrl_c() => {
            info!("Shutdown signal received. Exiting gracefully.");
        }
    }

    server.shutdown();
    Ok(())
}
