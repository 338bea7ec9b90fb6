//! Runner configuration built from defaults plus option functions.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tracing::Dispatch;

use crate::lifecycle::signals::{InterruptionListener, OsSignalListener, SignalKind};

/// Shutdown timeout used when none is configured.
pub const DEFAULT_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// What `Runner::run` does with stop failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopErrorPolicy {
    /// Log every failure and return `Ok(())`.
    #[default]
    Log,
    /// Log every failure and return them all as `RunnerError::Stop`.
    Return,
}

/// Resolved runner settings. Immutable once the runner is constructed.
#[derive(Clone)]
pub struct RunnerConfig {
    pub shutdown_timeout: Duration,
    pub interruption_listener: Arc<dyn InterruptionListener>,
    pub stop_errors: StopErrorPolicy,
    /// Wait for run tasks to exit after the sweep, bounded by the shutdown deadline.
    pub await_run_tasks: bool,
    /// Logger for runner events. `None` uses the current default dispatcher.
    pub logger: Option<Dispatch>,
}

impl RunnerConfig {
    /// Apply `options` in order over the defaults.
    pub fn build(options: impl IntoIterator<Item = RunnerOption>) -> Self {
        let mut config = Self::default();
        for option in options {
            option.apply(&mut config);
        }
        config
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            shutdown_timeout: DEFAULT_SHUTDOWN_TIMEOUT,
            interruption_listener: Arc::new(OsSignalListener::default()),
            stop_errors: StopErrorPolicy::default(),
            await_run_tasks: false,
            logger: None,
        }
    }
}

impl fmt::Debug for RunnerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunnerConfig")
            .field("shutdown_timeout", &self.shutdown_timeout)
            .field("stop_errors", &self.stop_errors)
            .field("await_run_tasks", &self.await_run_tasks)
            .field("logger", &self.logger.is_some())
            .finish_non_exhaustive()
    }
}

/// A single configuration override.
pub struct RunnerOption(Box<dyn FnOnce(&mut RunnerConfig) + Send>);

impl RunnerOption {
    pub fn new(apply: impl FnOnce(&mut RunnerConfig) + Send + 'static) -> Self {
        Self(Box::new(apply))
    }

    fn apply(self, config: &mut RunnerConfig) {
        (self.0)(config)
    }
}

/// Bound the shutdown sweep.
pub fn shutdown_timeout(timeout: Duration) -> RunnerOption {
    RunnerOption::new(move |config| config.shutdown_timeout = timeout)
}

/// Only shut down on the given OS signals.
pub fn interruption_signals(signals: impl IntoIterator<Item = SignalKind>) -> RunnerOption {
    interruption_listener(OsSignalListener::new(signals))
}

/// Replace the interruption strategy entirely.
pub fn interruption_listener(listener: impl InterruptionListener) -> RunnerOption {
    let listener: Arc<dyn InterruptionListener> = Arc::new(listener);
    RunnerOption::new(move |config| config.interruption_listener = listener)
}

pub fn stop_errors(policy: StopErrorPolicy) -> RunnerOption {
    RunnerOption::new(move |config| config.stop_errors = policy)
}

pub fn await_run_tasks(enabled: bool) -> RunnerOption {
    RunnerOption::new(move |config| config.await_run_tasks = enabled)
}

/// Route runner logs through `dispatch` instead of the global subscriber.
pub fn logger(dispatch: impl Into<Dispatch>) -> RunnerOption {
    let dispatch = dispatch.into();
    RunnerOption::new(move |config| config.logger = Some(dispatch))
}
