//! Error types for the runner and its entrypoints.

use std::fmt;
use std::time::Duration;

use thiserror::Error;

use crate::lifecycle::signals::SignalKind;

/// Error type returned by user supplied `run` and `stop` functions.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Failure to arrange delivery of an interruption.
#[derive(Debug, Error)]
pub enum ListenerError {
    #[error("failed to register handler for {signal}: {source}")]
    Register {
        signal: SignalKind,
        #[source]
        source: std::io::Error,
    },

    #[error("interruption listener failed: {0}")]
    Other(String),
}

/// An entrypoint's `run` ended abnormally.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("run {name}: {source}")]
    Failed {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("run {name}: task panicked")]
    Panicked { name: String },
}

impl RunError {
    /// Name of the entrypoint that failed.
    pub fn entrypoint(&self) -> &str {
        match self {
            RunError::Failed { name, .. } | RunError::Panicked { name } => name,
        }
    }
}

/// An entrypoint's `stop` failed or did not finish before the shutdown deadline.
#[derive(Debug, Error)]
pub enum StopError {
    #[error("stop {name}: {source}")]
    Failed {
        name: String,
        #[source]
        source: BoxError,
    },

    #[error("stop {name}: deadline of {timeout:?} exceeded")]
    DeadlineExceeded { name: String, timeout: Duration },
}

impl StopError {
    /// Name of the entrypoint that failed to stop.
    pub fn entrypoint(&self) -> &str {
        match self {
            StopError::Failed { name, .. } | StopError::DeadlineExceeded { name, .. } => name,
        }
    }
}

/// Every stop failure collected during one shutdown sweep, in declaration order.
#[derive(Debug, Default)]
pub struct StopErrors(pub Vec<StopError>);

impl StopErrors {
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &StopError> {
        self.0.iter()
    }
}

impl fmt::Display for StopErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, err) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", err)?;
        }
        Ok(())
    }
}

impl std::error::Error for StopErrors {}

/// Error returned by [`Runner::run`](crate::lifecycle::Runner::run).
#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("runner has already been started")]
    AlreadyStarted,

    #[error(transparent)]
    Listener(#[from] ListenerError),

    #[error("shutdown finished with {count} stop failure(s): {0}", count = .0.len())]
    Stop(StopErrors),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stop_errors_display_joins_entries() {
        let errors = StopErrors(vec![
            StopError::Failed {
                name: "api".into(),
                source: "socket busy".into(),
            },
            StopError::DeadlineExceeded {
                name: "worker".into(),
                timeout: Duration::from_secs(2),
            },
        ]);

        assert_eq!(
            errors.to_string(),
            "stop api: socket busy, stop worker: deadline of 2s exceeded"
        );
        assert_eq!(errors.iter().map(StopError::entrypoint).collect::<Vec<_>>(), ["api", "worker"]);
    }

    #[test]
    fn test_runner_error_reports_stop_failure_count() {
        let err = RunnerError::Stop(StopErrors(vec![StopError::Failed {
            name: "api".into(),
            source: "boom".into(),
        }]));

        assert_eq!(err.to_string(), "shutdown finished with 1 stop failure(s): stop api: boom");
    }

    #[test]
    fn test_run_error_names_entrypoint() {
        let err = RunError::Failed {
            name: "handler1".into(),
            source: "boom".into(),
        };
        assert_eq!(err.entrypoint(), "handler1");
        assert_eq!(err.to_string(), "run handler1: boom");
    }
}
