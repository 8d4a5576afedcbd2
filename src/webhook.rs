//! Webhook Fan-out
//!
//! Write paths hand notifications to a [`Notifier`], which queues them on an
//! unbounded channel drained by one worker task. The worker calls the
//! configured [`WebhookSink`]; a failing or slow sink never reaches back into
//! the write path.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

/// Outbound event names.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WebhookEvent {
    NewDialog,
    UpdateDialog,
    DeleteDialogs,
    NewMessage,
    UpdateMessages,
    DeleteMessages,
    HistorySync,
}

impl WebhookEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewDialog => "new dialog",
            Self::UpdateDialog => "update dialog",
            Self::DeleteDialogs => "delete dialogs",
            Self::NewMessage => "new message",
            Self::UpdateMessages => "update messages",
            Self::DeleteMessages => "delete messages",
            Self::HistorySync => "history sync",
        }
    }
}

impl std::fmt::Display for WebhookEvent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Destination for notifications. Implementations own delivery details.
#[async_trait]
pub trait WebhookSink: Send + Sync {
    async fn send(&self, session_id: &str, event: WebhookEvent, payload: Value)
    -> anyhow::Result<()>;
}

#[derive(Debug, Clone, PartialEq)]
pub struct Notification {
    pub session_id: String,
    pub event: WebhookEvent,
    pub payload: Value,
}

enum Outbound {
    Send(WebhookEvent, Value),
    Flush(oneshot::Sender<()>),
}

/// Cloneable, non-blocking handle to the outbound queue of one session.
#[derive(Clone)]
pub struct Notifier {
    session_id: Arc<str>,
    tx: mpsc::UnboundedSender<Outbound>,
}

/// Worker side of a [`Notifier`]; await it to flush the queue.
pub struct NotifierWorker {
    handle: JoinHandle<()>,
}

impl Notifier {
    /// Spawn the delivery worker. The worker exits once every `Notifier`
    /// clone has been dropped and the queue is empty.
    pub fn spawn(session_id: impl Into<String>, sink: Arc<dyn WebhookSink>) -> (Self, NotifierWorker) {
        let session_id: Arc<str> = Arc::from(session_id.into());
        let (tx, mut rx) = mpsc::unbounded_channel::<Outbound>();

        let worker_session = Arc::clone(&session_id);
        let handle = tokio::spawn(async move {
            while let Some(item) = rx.recv().await {
                match item {
                    Outbound::Send(event, payload) => {
                        if let Err(e) = sink.send(&worker_session, event, payload).await {
                            tracing::warn!(
                                session = %worker_session,
                                event = event.as_str(),
                                "Webhook delivery failed: {:#}",
                                e
                            );
                        }
                    }
                    Outbound::Flush(done) => {
                        let _ = done.send(());
                    }
                }
            }
        });

        (Self { session_id, tx }, NotifierWorker { handle })
    }

    /// Enqueue and return immediately.
    pub fn notify(&self, event: WebhookEvent, payload: Value) {
        if self.tx.send(Outbound::Send(event, payload)).is_err() {
            tracing::warn!(
                session = %self.session_id,
                event = event.as_str(),
                "Notification dropped, worker stopped"
            );
        }
    }

    /// Wait until everything queued before this call has been handed to the
    /// sink.
    pub async fn flush(&self) {
        let (done, wait) = oneshot::channel();
        if self.tx.send(Outbound::Flush(done)).is_ok() {
            let _ = wait.await;
        }
    }
}

impl NotifierWorker {
    pub async fn join(self) {
        if let Err(e) = self.handle.await {
            tracing::error!("Notification worker failed: {}", e);
        }
    }
}

/// Forwards notifications into a channel for an embedding application.
#[derive(Clone)]
pub struct ChannelSink {
    tx: mpsc::UnboundedSender<Notification>,
}

impl ChannelSink {
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl WebhookSink for ChannelSink {
    async fn send(
        &self,
        session_id: &str,
        event: WebhookEvent,
        payload: Value,
    ) -> anyhow::Result<()> {
        self.tx
            .send(Notification {
                session_id: session_id.to_string(),
                event,
                payload,
            })
            .map_err(|_| anyhow::anyhow!("notification receiver closed"))
    }
}

/// Writes every notification as a structured log line.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogSink;

#[async_trait]
impl WebhookSink for LogSink {
    async fn send(
        &self,
        session_id: &str,
        event: WebhookEvent,
        payload: Value,
    ) -> anyhow::Result<()> {
        tracing::info!(
            target: "wastore::webhook",
            session = session_id,
            event = event.as_str(),
            payload = %payload,
            "webhook"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    struct FailingSink;

    #[async_trait]
    impl WebhookSink for FailingSink {
        async fn send(&self, _: &str, _: WebhookEvent, _: Value) -> anyhow::Result<()> {
            anyhow::bail!("endpoint unreachable")
        }
    }

    #[test]
    fn test_event_names() {
        assert_eq!(WebhookEvent::NewDialog.as_str(), "new dialog");
        assert_eq!(WebhookEvent::DeleteMessages.to_string(), "delete messages");
        assert_eq!(WebhookEvent::HistorySync.as_str(), "history sync");
    }

    #[tokio::test]
    async fn test_notifier_delivers_in_order() {
        let (sink, mut rx) = ChannelSink::new();
        let (notifier, worker) = Notifier::spawn("S1", Arc::new(sink));

        notifier.notify(WebhookEvent::NewDialog, json!({"id": 1}));
        notifier.notify(WebhookEvent::DeleteDialogs, json!(["a"]));
        drop(notifier);
        worker.join().await;

        let first = rx.recv().await.unwrap();
        assert_eq!(first.session_id, "S1");
        assert_eq!(first.event, WebhookEvent::NewDialog);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.payload, json!(["a"]));
    }

    #[tokio::test]
    async fn test_flush_waits_for_queued_items() {
        let (sink, mut rx) = ChannelSink::new();
        let (notifier, _worker) = Notifier::spawn("S1", Arc::new(sink));
        for n in 0..10 {
            notifier.notify(WebhookEvent::NewMessage, json!({"n": n}));
        }
        notifier.flush().await;

        let mut count = 0;
        while rx.try_recv().is_ok() {
            count += 1;
        }
        assert_eq!(count, 10);
    }

    #[tokio::test]
    async fn test_sink_failure_does_not_stop_worker() {
        let (notifier, worker) = Notifier::spawn("S1", Arc::new(FailingSink));
        notifier.notify(WebhookEvent::NewMessage, json!({}));
        notifier.notify(WebhookEvent::NewMessage, json!({}));
        drop(notifier);
        // Worker drains both and exits cleanly
        worker.join().await;
    }
}
