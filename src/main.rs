//! CLI for Buoy
//!
//! Runs the relay. `--addr` overrides the configured `host:port`.

use buoy::config::load_config;
use buoy::transport::serve;
use buoy::utils::error::RelayError;
use buoy::utils::logging;
use clap::Parser;
use tracing::error;

#[derive(Parser)]
#[command(name = "buoy", about = "Topic-keyed HTTP to WebSocket message relay")]
struct Cli {
    /// Address to bind, e.g. localhost:8080
    #[arg(long)]
    addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), RelayError> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let settings = match load_config() {
        Ok(settings) => settings,
        Err(e) => {
            logging::init("info");
            error!("Failed to load configuration: {e}");
            return Err(e.into());
        }
    };
    logging::init(&settings.server.log_level);

    let addr = cli.addr.unwrap_or_else(|| settings.server.address());
    if let Err(e) = serve(settings, &addr).await {
        error!("Relay failed: {e}");
        return Err(e);
    }
    Ok(())
}
