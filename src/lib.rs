//! # Buoy
//!
//! `buoy` is a topic-keyed message relay. Producers `POST` JSON envelopes to
//! `/{topic}`; every WebSocket subscribed to `/{topic}` receives them
//! immediately. Subscribers can also publish by sending a frame over their own
//! socket, which is rebroadcast to the topic.
//!
//! ## Core Modules
//!
//! - `broker`: topic membership and fan-out, run as a single hub task.
//! - `session`: per-socket read/write duties, keepalive and teardown.
//! - `transport`: HTTP and WebSocket ingress plus envelope validation.
//! - `config`: layered configuration (file, environment, defaults).
//! - `utils`: error type and logging setup.

pub mod broker;
pub mod config;
pub mod session;
pub mod transport;
pub mod utils;
