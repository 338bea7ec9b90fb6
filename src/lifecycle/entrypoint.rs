//! The unit of composition managed by the runner.

use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures_util::future::BoxFuture;
use futures_util::FutureExt;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::error::BoxError;

/// Result of an entrypoint's `run` or `stop`.
pub type EntrypointResult = Result<(), BoxError>;

pub(crate) type RunFn =
    Arc<dyn Fn(CancellationToken) -> BoxFuture<'static, EntrypointResult> + Send + Sync>;
pub(crate) type StopFn =
    Arc<dyn Fn(StopContext) -> BoxFuture<'static, EntrypointResult> + Send + Sync>;

/// Deadline shared by every `stop` call of one shutdown sweep.
///
/// Computed once when the sweep starts; it is not reset per entrypoint, so a
/// slow `stop` leaves less time for the ones after it.
#[derive(Debug, Clone, Copy)]
pub struct StopContext {
    deadline: Instant,
    timeout: Duration,
}

impl StopContext {
    pub fn new(timeout: Duration) -> Self {
        Self {
            deadline: Instant::now() + timeout,
            timeout,
        }
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }

    /// The full shutdown timeout this context was created with.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn remaining(&self) -> Duration {
        self.deadline.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        Instant::now() >= self.deadline
    }

    /// Resolves when the deadline is reached.
    pub async fn expired(&self) {
        tokio::time::sleep_until(self.deadline).await
    }
}

/// A named long-running unit of work.
///
/// `run` receives the run-context shared by all entrypoints and should return
/// promptly once it is cancelled. `stop` receives a [`StopContext`] and must
/// unblock the corresponding `run`; it may be called even if `run` never
/// started.
#[derive(Clone)]
pub struct Entrypoint {
    pub(crate) name: String,
    pub(crate) run: RunFn,
    pub(crate) stop: Option<StopFn>,
}

impl Entrypoint {
    pub fn new<F, Fut>(name: impl Into<String>, run: F) -> Self
    where
        F: Fn(CancellationToken) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = EntrypointResult> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: Arc::new(move |token| run(token).boxed()),
            stop: None,
        }
    }

    pub fn with_stop<F, Fut>(mut self, stop: F) -> Self
    where
        F: Fn(StopContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = EntrypointResult> + Send + 'static,
    {
        self.stop = Some(Arc::new(move |ctx| stop(ctx).boxed()));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn has_stop(&self) -> bool {
        self.stop.is_some()
    }

    /// Fill in the no-op `stop` if none was supplied.
    pub(crate) fn normalize(mut self) -> Self {
        if self.stop.is_none() {
            self.stop = Some(noop_stop());
        }
        self
    }
}

impl fmt::Debug for Entrypoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Entrypoint")
            .field("name", &self.name)
            .field("has_stop", &self.has_stop())
            .finish()
    }
}

pub(crate) fn noop_stop() -> StopFn {
    Arc::new(|_ctx| async { Ok(()) }.boxed())
}
