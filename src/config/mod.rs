mod settings;

use crate::config::settings::PartialSettings;
use config::{Config, ConfigError, Environment, File};

pub use settings::{RelaySettings, ServerSettings, Settings};

/// Loads the configuration from `config/default` and `BUOY_*` environment
/// variables (`__` separates sections, e.g. `BUOY_SERVER__PORT`), then merges
/// the result over the defaults.
pub fn load_config() -> Result<Settings, ConfigError> {
    let builder = Config::builder()
        .add_source(File::with_name("config/default").required(false))
        .add_source(
            Environment::with_prefix("BUOY")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

    let config = builder.build()?;
    let partial: PartialSettings = config.try_deserialize()?;

    let settings = merge(partial, Settings::default());
    settings.validate()?;
    Ok(settings)
}

fn merge(partial: PartialSettings, default: Settings) -> Settings {
    let server = partial.server;
    let relay = partial.relay;

    Settings {
        server: ServerSettings {
            host: server
                .as_ref()
                .and_then(|s| s.host.clone())
                .unwrap_or(default.server.host),
            port: server
                .as_ref()
                .and_then(|s| s.port)
                .unwrap_or(default.server.port),
            log_level: server
                .as_ref()
                .and_then(|s| s.log_level.clone())
                .unwrap_or(default.server.log_level),
        },
        relay: RelaySettings {
            queue_capacity: relay
                .as_ref()
                .and_then(|r| r.queue_capacity)
                .unwrap_or(default.relay.queue_capacity),
            max_frame_size: relay
                .as_ref()
                .and_then(|r| r.max_frame_size)
                .unwrap_or(default.relay.max_frame_size),
            pong_wait_secs: relay
                .as_ref()
                .and_then(|r| r.pong_wait_secs)
                .unwrap_or(default.relay.pong_wait_secs),
            write_wait_secs: relay
                .as_ref()
                .and_then(|r| r.write_wait_secs)
                .unwrap_or(default.relay.write_wait_secs),
            hub_capacity: relay
                .as_ref()
                .and_then(|r| r.hub_capacity)
                .unwrap_or(default.relay.hub_capacity),
        },
    }
}
