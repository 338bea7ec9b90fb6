//! Programmatic shutdown requests.

use std::sync::Arc;

use tokio::sync::watch;

use crate::lifecycle::error::ListenerError;
use crate::lifecycle::signals::{Interruption, InterruptionListener, InterruptionSink};

/// Handle for requesting shutdown from inside the process.
///
/// Install it with [`interruption_listener`](crate::lifecycle::options::interruption_listener)
/// and call [`trigger`](Self::trigger) from anywhere. A trigger fired before the
/// runner starts listening is still delivered.
#[derive(Clone)]
pub struct ShutdownTrigger {
    tx: Arc<watch::Sender<Option<String>>>,
}

impl ShutdownTrigger {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(None);
        Self { tx: Arc::new(tx) }
    }

    /// Request shutdown. Only the first reason is kept.
    pub fn trigger(&self, reason: impl Into<String>) {
        let reason = reason.into();
        self.tx.send_if_modified(|current| {
            if current.is_some() {
                return false;
            }
            *current = Some(reason);
            true
        });
    }

    /// Whether shutdown has been requested.
    pub fn is_triggered(&self) -> bool {
        self.tx.borrow().is_some()
    }
}

impl Default for ShutdownTrigger {
    fn default() -> Self {
        Self::new()
    }
}

impl InterruptionListener for ShutdownTrigger {
    fn listen(&self, sink: InterruptionSink) -> Result<(), ListenerError> {
        let mut rx = self.tx.subscribe();
        tokio::spawn(async move {
            tokio::select! {
                requested = rx.wait_for(Option::is_some) => {
                    if let Ok(reason) = requested {
                        let reason = reason.clone().unwrap_or_default();
                        sink.notify(Interruption::Requested(reason));
                    }
                }
                _ = sink.closed() => {}
            }
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_trigger_before_listen_is_delivered() {
        let trigger = ShutdownTrigger::new();
        trigger.trigger("deploy");
        trigger.trigger("ignored");
        assert!(trigger.is_triggered());

        let (sink, mut rx) = InterruptionSink::channel();
        trigger.listen(sink).unwrap();

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("interruption not delivered");
        assert_eq!(received, Some(Interruption::Requested("deploy".into())));
    }

    #[tokio::test]
    async fn test_trigger_after_listen_is_delivered() {
        let trigger = ShutdownTrigger::default();
        let (sink, mut rx) = InterruptionSink::channel();
        trigger.listen(sink).unwrap();

        assert!(!trigger.is_triggered());
        trigger.clone().trigger("maintenance");

        let received = tokio::time::timeout(Duration::from_secs(1), rx.recv())
            .await
            .expect("interruption not delivered");
        assert_eq!(received, Some(Interruption::Requested("maintenance".into())));
    }
}
