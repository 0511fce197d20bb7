//! geo-authz server.
//!
//! ```text
//!     Proxy check ──▶ http (axum) ──▶ engine ──▶ analysis controllers ──▶ match controllers
//!                         ▲                                                     │
//!                         └──────────── allow + headers / deny + reason ◀───────┘
//! ```

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;

use geo_authz::http::HttpServer;
use geo_authz::lifecycle::{signals, startup, Shutdown};
use geo_authz::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "geo-authz")]
#[command(about = "Geo-aware external authorization service", long_about = None)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, env = "GEO_AUTHZ_CONFIG", default_value = "geo-authz.toml")]
    config: PathBuf,

    /// Validate configuration and build every controller, then exit
    #[arg(long)]
    check: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = geo_authz::config::load_config(&cli.config)?;
    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %cli.config.display(),
        "geo-authz starting"
    );

    let engine = Arc::new(startup::build_engine(&config)?);
    if cli.check {
        tracing::info!("Configuration OK");
        return Ok(());
    }

    if config.observability.metrics_enabled {
        if let Ok(addr) = config.observability.metrics_address.parse() {
            metrics::init_metrics(addr);
        } else {
            tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            );
        }
    }

    let listener = startup::bind(&config.listener).await?;
    let shutdown = Shutdown::new();
    let server = HttpServer::new(engine, &config.listener);
    let receiver = shutdown.subscribe();
    signals::spawn_signal_listener(&shutdown);

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
