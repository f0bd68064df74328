use config::ConfigError;
use serde::Deserialize;
use std::time::Duration;

/// Top-level configuration settings for the relay.
///
/// Includes settings for both the HTTP listener and the relay core.
#[derive(Debug, Deserialize, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub relay: RelaySettings,
}

/// Configuration settings for the server.
///
/// Defines the host and port the listener will bind to.
#[derive(Debug, Deserialize, Clone)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    pub log_level: String,
}

impl Settings {
    /// Rejects values the relay cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.relay.pong_wait_secs == 0 {
            return Err(ConfigError::Message(
                "relay.pong_wait_secs must be greater than zero".to_string(),
            ));
        }
        if self.relay.write_wait_secs == 0 {
            return Err(ConfigError::Message(
                "relay.write_wait_secs must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl ServerSettings {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Framing, keepalive and queueing parameters for sessions and the hub.
#[derive(Debug, Deserialize, Clone)]
pub struct RelaySettings {
    pub queue_capacity: usize,
    pub max_frame_size: usize,
    pub pong_wait_secs: u64,
    pub write_wait_secs: u64,
    pub hub_capacity: usize,
}

impl RelaySettings {
    pub fn pong_wait(&self) -> Duration {
        Duration::from_secs(self.pong_wait_secs)
    }

    pub fn write_wait(&self) -> Duration {
        Duration::from_secs(self.write_wait_secs)
    }
}

/// Partial configuration settings loaded from files or environment.
///
/// Missing values are filled from `Settings::default()`.
#[derive(Debug, Deserialize)]
pub struct PartialSettings {
    pub server: Option<PartialServerSettings>,
    pub relay: Option<PartialRelaySettings>,
}

#[derive(Debug, Deserialize)]
pub struct PartialServerSettings {
    pub host: Option<String>,
    pub port: Option<u16>,
    pub log_level: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PartialRelaySettings {
    pub queue_capacity: Option<usize>,
    pub max_frame_size: Option<usize>,
    pub pong_wait_secs: Option<u64>,
    pub write_wait_secs: Option<u64>,
    pub hub_capacity: Option<usize>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                host: "localhost".to_string(),
                port: 8080,
                log_level: "info".to_string(),
            },
            relay: RelaySettings {
                queue_capacity: 256,
                max_frame_size: 512,
                pong_wait_secs: 60,
                write_wait_secs: 10,
                hub_capacity: 1024,
            },
        }
    }
}
