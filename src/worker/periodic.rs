//! Periodic background worker.
//!
//! # Responsibilities
//! - Call a tick function on a fixed interval
//! - Exit the loop on run-context cancellation or `stop`
//!
//! # Design Decisions
//! - The first tick fires immediately
//! - A tick error ends `run` with that error, triggering shutdown
//! - Cancellation is checked before each tick, not during one

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::{Entrypoint, EntrypointResult};

/// Build an entrypoint that calls `tick` every `interval`.
///
/// # Panics
///
/// Panics if `interval` is zero.
pub fn periodic<F, Fut>(name: impl Into<String>, interval: Duration, tick: F) -> Entrypoint
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = EntrypointResult> + Send + 'static,
{
    assert!(!interval.is_zero(), "worker interval must be non-zero");

    let name = name.into();
    let tick = Arc::new(tick);
    let stopped = CancellationToken::new();

    let run_name = name.clone();
    let run_stopped = stopped.clone();
    Entrypoint::new(name, move |token: CancellationToken| {
        let name = run_name.clone();
        let stopped = run_stopped.clone();
        let tick = tick.clone();
        async move {
            tracing::info!(worker = %name, ?interval, "Worker starting");

            let mut ticker = time::interval(interval);
            loop {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        tracing::info!(worker = %name, "Worker cancelled, exiting loop");
                        break;
                    }
                    _ = stopped.cancelled() => {
                        tracing::info!(worker = %name, "Worker received stop, exiting loop");
                        break;
                    }
                    _ = ticker.tick() => {
                        if let Err(err) = tick().await {
                            tracing::warn!(worker = %name, error = %err, "Worker tick failed");
                            return Err(err);
                        }
                    }
                }
            }
            Ok(())
        }
    })
    .with_stop(move |_ctx| {
        let stopped = stopped.clone();
        async move {
            stopped.cancel();
            Ok(())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use crate::lifecycle::StopContext;

    #[tokio::test]
    async fn test_ticks_until_stopped() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let worker = periodic("heartbeat", Duration::from_millis(10), move || {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        });

        let running = tokio::spawn((worker.run)(CancellationToken::new()));
        time::sleep(Duration::from_millis(55)).await;

        let stop = worker.stop.clone().unwrap();
        stop(StopContext::new(Duration::from_secs(1))).await.unwrap();
        time::timeout(Duration::from_secs(1), running).await.unwrap().unwrap().unwrap();

        assert!(ticks.load(Ordering::SeqCst) >= 2);
    }

    #[tokio::test]
    async fn test_tick_error_ends_run() {
        let worker = periodic("flaky", Duration::from_millis(10), || async {
            Err("tick failed".into())
        });

        let err = (worker.run)(CancellationToken::new()).await.unwrap_err();
        assert_eq!(err.to_string(), "tick failed");
    }

    #[tokio::test]
    async fn test_cancelled_token_skips_ticks() {
        let ticks = Arc::new(AtomicUsize::new(0));
        let counter = ticks.clone();
        let worker = periodic("idle", Duration::from_millis(10), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(()) }
        });

        let token = CancellationToken::new();
        token.cancel();
        (worker.run)(token).await.unwrap();
        assert_eq!(ticks.load(Ordering::SeqCst), 0);
    }

    #[test]
    #[should_panic(expected = "worker interval must be non-zero")]
    fn test_zero_interval_panics() {
        let _ = periodic("bad", Duration::ZERO, || async { Ok(()) });
    }
}
