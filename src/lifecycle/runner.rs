//! Runner orchestration.
//!
//! # Responsibilities
//! - Start every entrypoint's `run` concurrently under one run-context
//! - Race "run group finished or failed" against an external interruption
//! - Drive one sequential, deadline-bounded stop sweep over all entrypoints
//!
//! # Design Decisions
//! - The run group is supervised by a detached task; returning from `run`
//!   never aborts entrypoint tasks
//! - The stop sweep uses its own deadline, independent of the run-context
//! - Stop failures are logged and never abort the sweep

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};

use futures_util::FutureExt;
use tokio::sync::oneshot;
use tokio::task::{JoinHandle, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::instrument::WithSubscriber;
use tracing::Instrument;

use crate::lifecycle::entrypoint::{noop_stop, Entrypoint, EntrypointResult, StopContext};
use crate::lifecycle::error::{RunError, RunnerError, StopError, StopErrors};
use crate::lifecycle::options::{RunnerConfig, RunnerOption, StopErrorPolicy};
use crate::lifecycle::signals::{Interruption, InterruptionSink};
use crate::observability::metrics;

/// Lifecycle state of a [`Runner`].
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Created = 0,
    Running = 1,
    ShuttingDown = 2,
    Done = 3,
}

impl From<u8> for RunnerState {
    fn from(val: u8) -> Self {
        match val {
            1 => RunnerState::Running,
            2 => RunnerState::ShuttingDown,
            3 => RunnerState::Done,
            _ => RunnerState::Created,
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RunnerState::Created => "created",
            RunnerState::Running => "running",
            RunnerState::ShuttingDown => "shutting_down",
            RunnerState::Done => "done",
        };
        f.write_str(name)
    }
}

/// Entrypoint name and the result of its `run`, with panics caught.
type RunOutcome = (String, std::thread::Result<EntrypointResult>);

/// What ended the running phase.
enum Trigger {
    Interrupted(Interruption),
    Failed(RunError),
    Completed,
}

impl Trigger {
    fn label(&self) -> &'static str {
        match self {
            Trigger::Interrupted(_) => "signal",
            Trigger::Failed(_) => "failure",
            Trigger::Completed => "completed",
        }
    }
}

/// Runs a fixed set of entrypoints until one fails, all finish, or an
/// interruption arrives, then stops each of them in declaration order.
///
/// A runner is single-use: a second call to [`run`](Self::run) returns
/// [`RunnerError::AlreadyStarted`].
pub struct Runner {
    entrypoints: Vec<Entrypoint>,
    config: RunnerConfig,
    state: AtomicU8,
    shutting_down: AtomicBool,
}

impl Runner {
    /// Create a runner over `entrypoints`, applying `options` over the defaults.
    ///
    /// # Panics
    ///
    /// Panics if `entrypoints` is empty.
    pub fn new(
        entrypoints: Vec<Entrypoint>,
        options: impl IntoIterator<Item = RunnerOption>,
    ) -> Self {
        if entrypoints.is_empty() {
            panic!("at least one entrypoint must be defined");
        }

        let config = RunnerConfig::build(options);
        let entrypoints = entrypoints.into_iter().map(Entrypoint::normalize).collect();

        Self {
            entrypoints,
            config,
            state: AtomicU8::new(RunnerState::Created as u8),
            shutting_down: AtomicBool::new(false),
        }
    }

    pub fn config(&self) -> &RunnerConfig {
        &self.config
    }

    /// Entrypoint names in declaration order.
    pub fn entrypoints(&self) -> impl Iterator<Item = &str> {
        self.entrypoints.iter().map(Entrypoint::name)
    }

    pub fn state(&self) -> RunnerState {
        self.state.load(Ordering::Acquire).into()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down.load(Ordering::Acquire)
    }

    /// Run every entrypoint and shut them all down once the first trigger fires.
    ///
    /// Returns once the stop sweep has finished. Run tasks that ignore both
    /// cancellation and their `stop` may still be running afterwards.
    pub async fn run(&self) -> Result<(), RunnerError> {
        match self.config.logger.clone() {
            Some(dispatch) => self.execute().with_subscriber(dispatch).await,
            None => self.execute().await,
        }
    }

    async fn execute(&self) -> Result<(), RunnerError> {
        self.state
            .compare_exchange(
                RunnerState::Created as u8,
                RunnerState::Running as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            )
            .map_err(|_| RunnerError::AlreadyStarted)?;

        let (sink, mut interruptions) = InterruptionSink::channel();
        if let Err(e) = self.config.interruption_listener.listen(sink) {
            tracing::error!(error = %e, "Failed to register interruption listener");
            self.set_state(RunnerState::Done);
            return Err(e.into());
        }

        let run_token = CancellationToken::new();
        let (report_tx, report_rx) = oneshot::channel();
        let tasks = self.spawn_entrypoints(&run_token);
        let group = tokio::spawn(
            supervise(tasks, run_token.clone(), report_tx).with_current_subscriber(),
        );

        let trigger = tokio::select! {
            Some(interruption) = interruptions.recv() => Trigger::Interrupted(interruption),
            reported = report_rx => match reported {
                Ok(Ok(())) => Trigger::Completed,
                Ok(Err(err)) => Trigger::Failed(err),
                Err(_) => Trigger::Completed,
            },
        };

        match &trigger {
            Trigger::Interrupted(interruption) => {
                tracing::info!(signal = %interruption, "Received shutdown signal");
            }
            Trigger::Failed(err) => {
                tracing::error!(
                    entrypoint.name = err.entrypoint(),
                    error = %err,
                    "Entrypoint failed"
                );
            }
            Trigger::Completed => tracing::info!("All entrypoints finished"),
        }
        metrics::record_shutdown(trigger.label());

        let Some((ctx, failures)) = self.sweep().await else {
            return Ok(());
        };

        if self.config.await_run_tasks {
            drain(group, ctx).await;
        }

        self.set_state(RunnerState::Done);
        tracing::info!(stop_failures = failures.len(), "Shutdown complete");

        match self.config.stop_errors {
            StopErrorPolicy::Return if !failures.is_empty() => Err(RunnerError::Stop(failures)),
            _ => Ok(()),
        }
    }

    fn spawn_entrypoints(&self, run_token: &CancellationToken) -> JoinSet<RunOutcome> {
        let mut tasks = JoinSet::new();

        for entrypoint in &self.entrypoints {
            let name = entrypoint.name.clone();
            let run = entrypoint.run.clone();
            let token = run_token.clone();
            let span = tracing::info_span!("entrypoint", name = %name);

            tasks.spawn(
                async move {
                    tracing::info!(entrypoint.name = %name, "Starting entrypoint");
                    metrics::record_run_started(&name);
                    let result = AssertUnwindSafe(run(token)).catch_unwind().await;
                    (name, result)
                }
                .instrument(span)
                .with_current_subscriber(),
            );
        }

        tasks
    }

    /// Stop every entrypoint in declaration order.
    ///
    /// Returns `None` if another caller already started the sweep.
    async fn sweep(&self) -> Option<(StopContext, StopErrors)> {
        if self
            .shutting_down
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return None;
        }
        self.set_state(RunnerState::ShuttingDown);

        let ctx = StopContext::new(self.config.shutdown_timeout);
        let mut failures = Vec::new();
        for entrypoint in &self.entrypoints {
            if let Err(err) = stop_entrypoint(entrypoint, ctx).await {
                failures.push(err);
            }
        }

        Some((ctx, StopErrors(failures)))
    }

    fn set_state(&self, state: RunnerState) {
        self.state.store(state as u8, Ordering::Release);
    }
}

impl fmt::Debug for Runner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runner")
            .field("entrypoints", &self.entrypoints)
            .field("config", &self.config)
            .field("state", &self.state())
            .finish()
    }
}

async fn stop_entrypoint(entrypoint: &Entrypoint, ctx: StopContext) -> Result<(), StopError> {
    let name = entrypoint.name();
    let stop = entrypoint.stop.clone().unwrap_or_else(noop_stop);

    tracing::info!(entrypoint.name = name, remaining = ?ctx.remaining(), "Stopping entrypoint");

    let started = Instant::now();
    let result = tokio::time::timeout_at(ctx.deadline(), stop(ctx)).await;
    let elapsed = started.elapsed();

    match result {
        Ok(Ok(())) => {
            metrics::record_stop(name, "ok", elapsed);
            tracing::info!(entrypoint.name = name, ?elapsed, "Entrypoint stopped");
            Ok(())
        }
        Ok(Err(source)) => {
            metrics::record_stop(name, "error", elapsed);
            tracing::warn!(entrypoint.name = name, error = %source, "Failed to stop entrypoint");
            Err(StopError::Failed {
                name: name.to_string(),
                source,
            })
        }
        Err(_) => {
            metrics::record_stop(name, "timeout", elapsed);
            tracing::warn!(
                entrypoint.name = name,
                timeout = ?ctx.timeout(),
                "Failed to stop entrypoint before shutdown deadline"
            );
            Err(StopError::DeadlineExceeded {
                name: name.to_string(),
                timeout: ctx.timeout(),
            })
        }
    }
}

/// Fail-fast supervision of the run group.
///
/// Reports the first failure (cancelling the run-context for every sibling),
/// or success once all tasks returned `Ok`, then keeps draining the rest.
async fn supervise(
    mut tasks: JoinSet<RunOutcome>,
    run_token: CancellationToken,
    report: oneshot::Sender<Result<(), RunError>>,
) {
    let mut report = Some(report);

    while let Some(joined) = tasks.join_next().await {
        let err = match joined {
            Ok((name, Ok(Ok(())))) => {
                tracing::debug!(entrypoint.name = %name, "Entrypoint returned");
                continue;
            }
            Ok((name, Ok(Err(source)))) => RunError::Failed { name, source },
            Ok((name, Err(_panic))) => RunError::Panicked { name },
            Err(join_err) => {
                tracing::debug!(error = %join_err, "Entrypoint task cancelled");
                continue;
            }
        };

        metrics::record_run_failure(err.entrypoint());
        run_token.cancel();

        match report.take() {
            Some(tx) => {
                if let Err(Err(err)) = tx.send(Err(err)) {
                    tracing::warn!(
                        entrypoint.name = err.entrypoint(),
                        error = %err,
                        "Entrypoint failed after shutdown was triggered"
                    );
                }
            }
            None => tracing::warn!(error = %err, "Additional entrypoint failure"),
        }
    }

    if let Some(tx) = report.take() {
        let _ = tx.send(Ok(()));
    }
}

async fn drain(group: JoinHandle<()>, ctx: StopContext) {
    match tokio::time::timeout_at(ctx.deadline(), group).await {
        Ok(_) => tracing::debug!("All run tasks exited"),
        Err(_) => tracing::warn!("Run tasks still running after shutdown deadline"),
    }
}
