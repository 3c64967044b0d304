//! Mishtrix BFF Server
//!
//! Serves the dashboard engine over HTTP. Stateless apart from the
//! per-process navigation state; the ML backend does the heavy lifting.

use dotenvy::dotenv;
use mishtrix::config::Config;
use mishtrix::core::http::start_server;
use mishtrix::logging;
use tokio::signal;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env if present
    dotenv().ok();

    logging::init_logging();

    let config = Config::from_env();
    let env = mishtrix::config::get_environment();
    info!("Starting Mishtrix Trend Engine");
    info!(environment = %env, "Environment");
    info!(port = config.port, "HTTP Server: http://0.0.0.0:{}", config.port);

    let server_handle = tokio::spawn(async move {
        if let Err(e) = start_server(config).await {
            error!(error = %e, "HTTP server error");
        }
    });

    // Graceful shutdown on ctrl-c
    signal::ctrl_c().await?;
    info!("Shutdown signal received");
    server_handle.abort();

    Ok(())
}
