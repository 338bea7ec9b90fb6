//! Metrics collection and exposition.
//!
//! # Metrics
//! - `entrypoint_runs_started_total` (counter): run tasks spawned, by entrypoint
//! - `entrypoint_run_failures_total` (counter): run errors and panics, by entrypoint
//! - `entrypoint_stops_total` (counter): stop calls by entrypoint and outcome (`ok|error|timeout`)
//! - `entrypoint_stop_duration_seconds` (histogram): time spent in each stop call
//! - `runner_shutdowns_total` (counter): shutdown sweeps by trigger (`signal|failure|completed`)

use std::net::SocketAddr;
use std::time::Duration;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_run_started(entrypoint: &str) {
    counter!("entrypoint_runs_started_total", "entrypoint" => entrypoint.to_string()).increment(1);
}

pub fn record_run_failure(entrypoint: &str) {
    counter!("entrypoint_run_failures_total", "entrypoint" => entrypoint.to_string()).increment(1);
}

pub fn record_stop(entrypoint: &str, outcome: &'static str, elapsed: Duration) {
    counter!(
        "entrypoint_stops_total",
        "entrypoint" => entrypoint.to_string(),
        "outcome" => outcome
    )
    .increment(1);
    histogram!("entrypoint_stop_duration_seconds", "entrypoint" => entrypoint.to_string())
        .record(elapsed.as_secs_f64());
}

pub fn record_shutdown(trigger: &'static str) {
    counter!("runner_shutdowns_total", "trigger" => trigger).increment(1);
}
