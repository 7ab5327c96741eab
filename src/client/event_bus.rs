use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tokio::sync::broadcast::error::SendError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeLevel {
    Info,
    Success,
    Warning,
    Error,
}

/// Short-lived message for the operator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ClientEvent {
    Notice(Notice),
    /// Rendered buffer table that should be scrolled into view.
    BufferView { table: String },
    BatchStarted { batch_id: String, count: usize },
    ItemSent { batch_id: String, index: usize, written: String },
}

/// Fan-out of client events to whoever renders them.
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<ClientEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(100);
        Self { tx }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ClientEvent> {
        self.tx.subscribe()
    }

    pub fn send(&self, event: ClientEvent) -> Result<(), SendError<ClientEvent>> {
        self.tx.send(event).map(|_| ())
    }

    /// Publishes a notice. Having no subscriber is not an error.
    pub fn notify(&self, level: NoticeLevel, message: impl Into<String>) {
        let message = message.into();
        tracing::debug!(?level, message = %message, "notice");
        let _ = self.send(ClientEvent::Notice(Notice { level, message }));
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
