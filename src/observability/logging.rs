//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global `tracing` subscriber for the binary
//! - Respect `RUST_LOG`, falling back to a sensible default filter

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Filter used when `RUST_LOG` is unset.
pub const DEFAULT_FILTER: &str = "entrypoint_runner=info,tower_http=info";

/// Install the global subscriber.
///
/// `verbose` raises the default filter to `debug`; an explicit `RUST_LOG`
/// always wins.
pub fn init(verbose: bool) {
    let fallback = if verbose {
        "entrypoint_runner=debug,tower_http=debug"
    } else {
        DEFAULT_FILTER
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| fallback.into()))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();
}
