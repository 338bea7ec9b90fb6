//! Shared utilities for runner integration tests.

#![allow(dead_code)]

use std::sync::{Arc, Mutex};
use std::time::Duration;

use entrypoint_runner::lifecycle::{
    EntrypointResult, InterruptionListener, InterruptionSink, ListenerError, SignalKind,
};
use tokio_util::sync::CancellationToken;
use tracing::field::{Field, Visit};
use tracing::{Dispatch, Event, Subscriber};
use tracing_subscriber::layer::{Context, SubscriberExt};
use tracing_subscriber::Layer;

/// Interruption listener that captures the sink so a test can fire it.
#[derive(Clone, Default)]
pub struct MockInterruptionListener {
    sink: Arc<Mutex<Option<InterruptionSink>>>,
}

impl MockInterruptionListener {
    pub fn notify(&self, kind: SignalKind) {
        let sink = self.sink.lock().unwrap();
        let sink = sink.as_ref().expect("signal sink not provided");
        assert!(sink.notify(kind), "interruption was not accepted");
    }

    pub fn is_listening(&self) -> bool {
        self.sink.lock().unwrap().is_some()
    }
}

impl InterruptionListener for MockInterruptionListener {
    fn listen(&self, sink: InterruptionSink) -> Result<(), ListenerError> {
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }
}

/// Sleep for `duration` unless the run-context is cancelled first.
pub async fn sleep(token: CancellationToken, duration: Duration) -> EntrypointResult {
    tokio::select! {
        _ = tokio::time::sleep(duration) => Ok(()),
        _ = token.cancelled() => Err("context canceled".into()),
    }
}

/// Ordered record of events shared between entrypoints and the test.
#[derive(Clone, Default)]
pub struct Journal {
    events: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn record(&self, event: impl Into<String>) {
        self.events.lock().unwrap().push(event.into());
    }

    pub fn events(&self) -> Vec<String> {
        self.events.lock().unwrap().clone()
    }

    pub fn contains(&self, event: &str) -> bool {
        self.events.lock().unwrap().iter().any(|e| e == event)
    }
}

/// Layer that keeps the message of every event it sees.
struct CaptureLayer {
    journal: Journal,
}

struct MessageVisitor(Option<String>);

impl Visit for MessageVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0 = Some(format!("{:?}", value));
        }
    }
}

impl<S: Subscriber> Layer<S> for CaptureLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let mut visitor = MessageVisitor(None);
        event.record(&mut visitor);
        if let Some(message) = visitor.0 {
            self.journal.record(message);
        }
    }
}

/// A dispatch that records log messages into the returned journal.
pub fn capture_logs() -> (Dispatch, Journal) {
    let journal = Journal::default();
    let subscriber = tracing_subscriber::registry().with(CaptureLayer {
        journal: journal.clone(),
    });
    (Dispatch::new(subscriber), journal)
}
