//! entrypoint-runner demo
//!
//! Runs an HTTP server and a heartbeat worker under one [`Runner`] and shuts
//! both down on SIGINT/SIGTERM.
//!
//! ```text
//!   SIGINT/SIGTERM ──┐
//!                    ▼
//!   ┌──────────────────────────── Runner ───────────────────────────┐
//!   │  run (concurrent)                 stop (sequential, bounded)  │
//!   │  ┌──────────────┐                 1. http: graceful close     │
//!   │  │ http (axum)  │                 2. heartbeat: exit loop     │
//!   │  ├──────────────┤                                             │
//!   │  │ heartbeat    │                                             │
//!   │  └──────────────┘                                             │
//!   └───────────────────────────────────────────────────────────────┘
//! ```

use std::net::SocketAddr;
use std::time::Duration;

use axum::{routing::get, Extension, Router};
use clap::Parser;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use entrypoint_runner::http::http_server;
use entrypoint_runner::lifecycle::StopErrorPolicy;
use entrypoint_runner::observability::{logging, metrics};
use entrypoint_runner::options;
use entrypoint_runner::worker::periodic;
use entrypoint_runner::Runner;

/// Run an HTTP server and a heartbeat worker until interrupted.
#[derive(Parser, Debug)]
#[command(name = "entrypoint-runner", version, about)]
struct Cli {
    /// Address the HTTP server binds to
    #[arg(long, default_value = "127.0.0.1:8080")]
    bind: SocketAddr,

    /// Upper bound for the whole shutdown sweep, in seconds
    #[arg(long, default_value_t = 30)]
    shutdown_timeout_secs: u64,

    /// Heartbeat interval, in seconds
    #[arg(long, default_value_t = 10)]
    heartbeat_secs: u64,

    /// Expose Prometheus metrics on this address
    #[arg(long)]
    metrics_address: Option<SocketAddr>,

    /// Exit non-zero if any entrypoint fails to stop
    #[arg(long)]
    return_stop_errors: bool,

    /// Debug logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    tracing::info!("entrypoint-runner v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::debug!(?cli, "parsed CLI arguments");

    if let Some(addr) = cli.metrics_address {
        metrics::init_metrics(addr)?;
    }

    let listener = TcpListener::bind(cli.bind).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let router = Router::new()
        .route("/", get(root))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http());

    let heartbeat = periodic("heartbeat", Duration::from_secs(cli.heartbeat_secs.max(1)), || async {
        tracing::info!("heartbeat");
        Ok(())
    });

    let policy = if cli.return_stop_errors {
        StopErrorPolicy::Return
    } else {
        StopErrorPolicy::Log
    };

    let runner = Runner::new(
        vec![http_server("http", listener, router), heartbeat],
        [
            options::shutdown_timeout(Duration::from_secs(cli.shutdown_timeout_secs)),
            options::stop_errors(policy),
            options::await_run_tasks(true),
        ],
    );

    runner.run().await?;

    tracing::info!("Exiting");
    Ok(())
}

async fn root() -> &'static str {
    "entrypoint-runner\n"
}

async fn health(Extension(token): Extension<CancellationToken>) -> &'static str {
    if token.is_cancelled() {
        "shutting down\n"
    } else {
        "ok\n"
    }
}
