//! Process lifecycle orchestration for long-lived async components.
//!
//! A [`Runner`] owns a fixed set of [`Entrypoint`]s (servers, background
//! workers), runs them concurrently until one fails, all finish, or the
//! process is interrupted, then stops each of them in order within a bounded
//! shutdown window.

pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod worker;

pub use lifecycle::options;
pub use lifecycle::{Entrypoint, Runner, RunnerError, ShutdownTrigger, SignalKind, StopContext};
