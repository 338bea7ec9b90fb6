//! Serve an axum [`Router`] as an [`Entrypoint`].
//!
//! # Responsibilities
//! - `run`: bind the router to its listener and serve until closed
//! - `stop`: request a graceful close and wait for draining
//!
//! # Design Decisions
//! - A close requested before or while serving is not an error
//! - The listener is consumed by the first `run`; serving twice is an error
//! - `stop` on a server that never started returns immediately

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use axum::{Extension, Router};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;

use crate::lifecycle::{Entrypoint, EntrypointResult, StopContext};

/// Error type for the HTTP server entrypoint.
#[derive(Debug, Error)]
pub enum HttpServerError {
    #[error("HTTP server {0} has already been served")]
    AlreadyServed(String),

    #[error("HTTP server {0} did not finish draining before the shutdown deadline")]
    ShutdownTimeout(String),
}

struct ServerControl {
    name: String,
    listener: Mutex<Option<TcpListener>>,
    router: Router,
    close: CancellationToken,
    started: AtomicBool,
    finished: CancellationToken,
}

/// Build an entrypoint serving `router` on `listener`.
///
/// The run-context is added to every request as an
/// `Extension<CancellationToken>`, and serving ends gracefully when either
/// `stop` is called or the run-context is cancelled.
pub fn http_server(name: impl Into<String>, listener: TcpListener, router: Router) -> Entrypoint {
    let name = name.into();
    let control = Arc::new(ServerControl {
        name: name.clone(),
        listener: Mutex::new(Some(listener)),
        router,
        close: CancellationToken::new(),
        started: AtomicBool::new(false),
        finished: CancellationToken::new(),
    });

    let run_control = control.clone();
    Entrypoint::new(name, move |token| {
        let control = run_control.clone();
        async move { control.serve(token).await }
    })
    .with_stop(move |ctx| {
        let control = control.clone();
        async move { control.shutdown(ctx).await }
    })
}

impl ServerControl {
    async fn serve(&self, token: CancellationToken) -> EntrypointResult {
        let listener = self
            .listener
            .lock()
            .await
            .take()
            .ok_or_else(|| HttpServerError::AlreadyServed(self.name.clone()))?;

        self.started.store(true, Ordering::SeqCst);
        if self.close.is_cancelled() {
            tracing::info!(server = %self.name, "HTTP server closed before serving");
            self.finished.cancel();
            return Ok(());
        }

        let addr = listener.local_addr()?;
        tracing::info!(server = %self.name, address = %addr, "HTTP server starting");

        let app = self.router.clone().layer(Extension(token.clone()));
        let close = self.close.clone();
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                tokio::select! {
                    _ = close.cancelled() => {}
                    _ = token.cancelled() => {}
                }
            })
            .await;

        self.finished.cancel();
        result?;

        tracing::info!(server = %self.name, "HTTP server stopped");
        Ok(())
    }

    async fn shutdown(&self, ctx: StopContext) -> EntrypointResult {
        self.close.cancel();
        if !self.started.load(Ordering::SeqCst) {
            return Ok(());
        }

        tokio::select! {
            biased;
            _ = self.finished.cancelled() => Ok(()),
            _ = ctx.expired() => Err(HttpServerError::ShutdownTimeout(self.name.clone()).into()),
        }
    }
}
