//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! Runner and entrypoint adapters produce:
//!     → logging.rs (structured log events via `tracing`)
//!     → metrics.rs (counters and histograms via `metrics`)
//!
//! Consumers:
//!     → Log output (stdout, filtered by RUST_LOG)
//!     → Metrics endpoint (Prometheus scrape, optional)
//! ```
//!
//! # Design Decisions
//! - Library code only emits events; the binary installs subscribers/recorders
//! - Recording metrics without an installed recorder is a no-op
//! - The runner can route its logs to an injected `tracing::Dispatch`

pub mod logging;
pub mod metrics;
