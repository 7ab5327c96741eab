use std::sync::Arc;

use crate::client::api::IntakeApi;
use crate::client::buffer::{BufferError, IntakeState};
use crate::client::event_bus::{ClientEvent, EventBus, NoticeLevel};

#[derive(Debug, Clone, PartialEq)]
pub enum BatchOutcome {
    /// Nothing was sent: empty buffer or a batch already running.
    Skipped(BufferError),
    Sent { count: usize, timestamp: i64 },
    /// Entry `failed_index` was rejected; `sent` entries before it are
    /// already on the server.
    Failed {
        sent: usize,
        failed_index: usize,
        error: String,
    },
}

/// Drains the buffer against the intake server, one request at a time.
pub struct BatchSender {
    api: Arc<dyn IntakeApi>,
    bus: EventBus,
}

impl BatchSender {
    pub fn new(api: Arc<dyn IntakeApi>, bus: EventBus) -> Self {
        Self { api, bus }
    }

    /// Sends every entry in order with one shared timestamp.
    ///
    /// The timestamp comes from the server clock; if that request fails the
    /// local clock is used and a warning is published. The first rejected
    /// entry stops the batch. Entries are only removed when all of them
    /// made it.
    pub async fn send(&self, state: &IntakeState) -> (IntakeState, BatchOutcome) {
        let sending = match state.begin_send() {
            Ok(s) => s,
            Err(e) => {
                tracing::debug!(reason = %e, "batch skipped");
                if e == BufferError::EmptyBuffer {
                    self.bus.notify(NoticeLevel::Info, e.to_string());
                }
                return (state.clone(), BatchOutcome::Skipped(e));
            }
        };

        let batch_id = uuid::Uuid::new_v4().to_string();
        let count = sending.entries().len();
        let _ = self.bus.send(ClientEvent::BatchStarted {
            batch_id: batch_id.clone(),
            count,
        });

        let timestamp = match self.api.server_time().await {
            Ok(ts) => ts,
            Err(e) => {
                tracing::warn!(batch = %batch_id, error = %e, "server time unavailable, using local clock");
                self.bus.notify(
                    NoticeLevel::Warning,
                    format!("Could not read server time ({}); using local time", e.user_message()),
                );
                chrono::Utc::now().timestamp_millis()
            }
        };
        tracing::info!(batch = %batch_id, count, timestamp, "sending batch");

        for (index, entry) in sending.entries().iter().enumerate() {
            match self.api.add_item(&entry.code, entry.qtty, Some(timestamp)).await {
                Ok(written) => {
                    tracing::debug!(batch = %batch_id, index, written = %written, "item sent");
                    let _ = self.bus.send(ClientEvent::ItemSent {
                        batch_id: batch_id.clone(),
                        index,
                        written,
                    });
                }
                Err(e) => {
                    let error = e.user_message();
                    tracing::error!(batch = %batch_id, index, error = %e, "batch aborted");
                    self.bus.notify(
                        NoticeLevel::Error,
                        format!("Send failed at item {} of {count}: {error}", index + 1),
                    );
                    return (
                        sending.finish_send(false),
                        BatchOutcome::Failed {
                            sent: index,
                            failed_index: index,
                            error,
                        },
                    );
                }
            }
        }

        tracing::info!(batch = %batch_id, count, "batch complete");
        self.bus
            .notify(NoticeLevel::Success, format!("Sent {count} item(s)"));
        (
            sending.finish_send(true),
            BatchOutcome::Sent { count, timestamp },
        )
    }
}
