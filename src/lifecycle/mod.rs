//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Runner::new (runner.rs):
//!     Entrypoints + options → options.rs (RunnerConfig) → normalize missing stop
//!
//! Runner::run (runner.rs):
//!     Spawn every entrypoint's run under one CancellationToken
//!     Race: run group done/failed  vs  interruption (signals.rs, shutdown.rs)
//!     → Stop sweep: entrypoint.rs StopContext, declaration order, one at a time
//! ```
//!
//! # Design Decisions
//! - Fail fast: the first run error cancels the run-context for every sibling
//! - Shutdown has one shared deadline, not one per entrypoint
//! - Shutdown always makes forward progress: stop failures are logged, not fatal
//! - A runner is single-use: Created → Running → ShuttingDown → Done

pub mod entrypoint;
pub mod error;
pub mod options;
pub mod runner;
pub mod shutdown;
pub mod signals;

pub use entrypoint::{Entrypoint, EntrypointResult, StopContext};
pub use error::{BoxError, ListenerError, RunError, RunnerError, StopError, StopErrors};
pub use options::{RunnerConfig, RunnerOption, StopErrorPolicy, DEFAULT_SHUTDOWN_TIMEOUT};
pub use runner::{Runner, RunnerState};
pub use shutdown::ShutdownTrigger;
pub use signals::{
    Interruption, InterruptionListener, InterruptionSink, OsSignalListener, SignalKind,
};
