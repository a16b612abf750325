//! Edge forwarder
//!
//! Forwards every inbound HTTP request to one fixed upstream.
//!
//! ```text
//!     Client ──▶ edge hop ──▶ ┌────────────────────────────────────────────┐
//!                             │               EDGE FORWARDER               │
//!                             │                                            │
//!                             │  server ─▶ edge metadata ─▶ handler        │
//!                             │                               │            │
//!                             │              rewrite target ◀─┤            │
//!                             │              forward headers ◀┤            │
//!                             │                               ▼            │
//!                             │                         transport ─────────┼──▶ Upstream
//!                             │                               │            │
//!     Client ◀────────────────┼── response (verbatim or 502 page)          │
//!                             └────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use edge_forwarder::config::{loader, Overrides};
use edge_forwarder::lifecycle::{signals, Shutdown};
use edge_forwarder::observability::{logging, metrics};
use edge_forwarder::HttpServer;

#[derive(Parser)]
#[command(name = "edge-forwarder", version)]
#[command(about = "Forward HTTP requests to a fixed upstream", long_about = None)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "EDGE_FORWARDER_CONFIG")]
    config: Option<PathBuf>,

    /// Upstream base URL, e.g. http://origin.internal:8001
    #[arg(short, long, env = "EDGE_FORWARDER_UPSTREAM")]
    upstream: Option<String>,

    /// Address to listen on
    #[arg(short, long, env = "EDGE_FORWARDER_BIND")]
    bind: Option<String>,

    /// Log every forwarded request and upstream response
    #[arg(long, env = "EDGE_FORWARDER_DEBUG", num_args = 0..=1, default_missing_value = "true")]
    debug: Option<bool>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let overrides = Overrides {
        upstream: cli.upstream,
        bind_address: cli.bind,
        debug: cli.debug,
    };

    let config = loader::load(cli.config.as_deref(), &overrides)?;
    logging::init_logging(&config.observability)?;

    tracing::info!("edge-forwarder v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.base_url,
        follow_redirects = config.upstream.follow_redirects,
        upstream_timeout_secs = config.timeouts.upstream_secs,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        metrics::init_metrics(config.observability.metrics_address.parse()?)?;
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let server = HttpServer::new(config)?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    tokio::spawn(async move {
        signals::wait_for_signal().await;
        shutdown.trigger();
    });

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
