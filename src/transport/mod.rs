//! The `transport` module holds the ingress adapters: topic and envelope
//! validation, and the HTTP/WebSocket server that turns requests into hub
//! and session operations.

pub mod envelope;
pub mod server;

#[cfg(test)]
mod server_tests;

pub use envelope::{Envelope, canonicalize, is_valid_topic};
pub use server::{AppState, ServerHandle, build_router, serve, start};
