//! Interruption delivery.
//!
//! # Responsibilities
//! - Define what an external shutdown trigger looks like ([`Interruption`])
//! - Provide the swappable [`InterruptionListener`] seam
//! - Default strategy: OS termination signals (SIGINT, SIGTERM)
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - The sink holds a single slot: at most one interruption per execution
//! - Listener tasks exit once the runner stops listening

use std::fmt;

use futures_util::future::{select_all, BoxFuture};
use futures_util::FutureExt;
use tokio::sync::mpsc;

use crate::lifecycle::error::ListenerError;

/// OS signal kinds that may trigger a shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignalKind {
    /// SIGINT (Ctrl+C).
    Interrupt,
    /// SIGTERM.
    Terminate,
    /// SIGHUP.
    Hangup,
    /// SIGQUIT.
    Quit,
}

impl fmt::Display for SignalKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SignalKind::Interrupt => "SIGINT",
            SignalKind::Terminate => "SIGTERM",
            SignalKind::Hangup => "SIGHUP",
            SignalKind::Quit => "SIGQUIT",
        };
        f.write_str(name)
    }
}

#[cfg(unix)]
impl From<SignalKind> for tokio::signal::unix::SignalKind {
    fn from(kind: SignalKind) -> Self {
        use tokio::signal::unix::SignalKind as Unix;
        match kind {
            SignalKind::Interrupt => Unix::interrupt(),
            SignalKind::Terminate => Unix::terminate(),
            SignalKind::Hangup => Unix::hangup(),
            SignalKind::Quit => Unix::quit(),
        }
    }
}

/// An external request to shut down.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interruption {
    /// An OS signal was received.
    Signal(SignalKind),
    /// Shutdown was requested programmatically.
    Requested(String),
}

impl fmt::Display for Interruption {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interruption::Signal(kind) => write!(f, "{}", kind),
            Interruption::Requested(reason) => write!(f, "requested: {}", reason),
        }
    }
}

impl From<SignalKind> for Interruption {
    fn from(kind: SignalKind) -> Self {
        Interruption::Signal(kind)
    }
}

/// Write side of the runner's interruption channel.
#[derive(Debug, Clone)]
pub struct InterruptionSink {
    tx: mpsc::Sender<Interruption>,
}

impl InterruptionSink {
    /// Create a sink and the receiver the runner waits on.
    pub fn channel() -> (Self, mpsc::Receiver<Interruption>) {
        let (tx, rx) = mpsc::channel(1);
        (Self { tx }, rx)
    }

    /// Deliver an interruption.
    ///
    /// Returns `false` if one is already pending or the runner is no longer
    /// listening.
    pub fn notify(&self, interruption: impl Into<Interruption>) -> bool {
        self.tx.try_send(interruption.into()).is_ok()
    }

    /// Whether the runner has stopped listening.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Resolves once the runner has stopped listening.
    pub async fn closed(&self) {
        self.tx.closed().await
    }
}

/// Strategy that arranges for an external shutdown trigger to reach a sink.
///
/// Implemented for any `Fn(InterruptionSink) -> Result<(), ListenerError>`, so
/// tests can capture the sink and inject a synthetic interruption.
pub trait InterruptionListener: Send + Sync + 'static {
    fn listen(&self, sink: InterruptionSink) -> Result<(), ListenerError>;
}

impl<F> InterruptionListener for F
where
    F: Fn(InterruptionSink) -> Result<(), ListenerError> + Send + Sync + 'static,
{
    fn listen(&self, sink: InterruptionSink) -> Result<(), ListenerError> {
        self(sink)
    }
}

/// Listens for a set of OS signals.
#[derive(Debug, Clone)]
pub struct OsSignalListener {
    signals: Vec<SignalKind>,
}

impl OsSignalListener {
    pub fn new(signals: impl IntoIterator<Item = SignalKind>) -> Self {
        let mut unique = Vec::new();
        for kind in signals {
            if !unique.contains(&kind) {
                unique.push(kind);
            }
        }
        Self { signals: unique }
    }

    pub fn signals(&self) -> &[SignalKind] {
        &self.signals
    }

    #[cfg(unix)]
    fn register(&self) -> Result<Vec<BoxFuture<'static, SignalKind>>, ListenerError> {
        use tokio::signal::unix::signal;

        let mut waiters = Vec::with_capacity(self.signals.len());
        for &kind in &self.signals {
            let mut stream = signal(kind.into())
                .map_err(|source| ListenerError::Register { signal: kind, source })?;
            waiters.push(
                async move {
                    stream.recv().await;
                    kind
                }
                .boxed(),
            );
        }
        Ok(waiters)
    }

    #[cfg(not(unix))]
    fn register(&self) -> Result<Vec<BoxFuture<'static, SignalKind>>, ListenerError> {
        let mut waiters = Vec::new();
        for &kind in &self.signals {
            if kind == SignalKind::Interrupt {
                waiters.push(
                    async {
                        let _ = tokio::signal::ctrl_c().await;
                        SignalKind::Interrupt
                    }
                    .boxed(),
                );
            } else {
                tracing::warn!(
                    signal = %kind,
                    "Interruption signal not supported on this platform"
                );
            }
        }
        Ok(waiters)
    }
}

impl Default for OsSignalListener {
    fn default() -> Self {
        Self::new([SignalKind::Interrupt, SignalKind::Terminate])
    }
}

impl InterruptionListener for OsSignalListener {
    fn listen(&self, sink: InterruptionSink) -> Result<(), ListenerError> {
        let waiters = self.register()?;
        if waiters.is_empty() {
            tracing::warn!(requested = ?self.signals, "No interruption signals registered");
            return Ok(());
        }

        tokio::spawn(async move {
            tokio::select! {
                (kind, _, _) = select_all(waiters) => {
                    sink.notify(kind);
                }
                _ = sink.closed() => {}
            }
        });
        Ok(())
    }
}
