//! HTTP server entrypoint adapter.
//!
//! # Data Flow
//! ```text
//! Runner spawns run → server.rs serves the axum Router on its listener
//!     → handlers can extract the run-context (Extension<CancellationToken>)
//! Runner calls stop → graceful close → wait for in-flight requests to drain
//!     (bounded by the StopContext deadline)
//! ```

pub mod server;

pub use server::{http_server, HttpServerError};
