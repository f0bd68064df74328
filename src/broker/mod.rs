//! The broker is the relay's registry: it owns the topic → sessions mapping
//! and performs fan-out. `engine` holds the state, `hub` runs it as a single
//! serialized task.

pub mod engine;
pub mod hub;
pub mod topic;

pub use engine::{Broker, Delivery};
pub use hub::{Command, Hub, HubHandle};
pub use topic::{Outbound, SessionId, Topic};
