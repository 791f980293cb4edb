//! Chatroom Server - Entry Point
//!
//! Binds the TCP listener and hands it to the accept loop.

use std::env;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use chatroom::{serve, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=chatroom=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("chatroom=info")),
        )
        .init();

    // Port from the first argument, or the default
    let config = ServerConfig::from_args(env::args().skip(1))?;

    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!("Chatroom open on {}", listener.local_addr()?);

    // Only a listener failure gets us out of here
    if let Err(e) = serve(listener).await {
        error!("Listener failed: {}", e);
        return Err(e.into());
    }

    Ok(())
}
