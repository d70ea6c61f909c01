use crate::modules::recorded_events::core::event_record::{EventRecord, ReceivedEvent};
use async_trait::async_trait;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum EventLogError {
    #[error("event log unavailable: {0}")]
    Unavailable(String),
}

/// Append-only log of recorded events.
///
/// Readers that want to follow the log call `subscribe` first and then read; every append
/// publishes the new length on the subscription, so nothing appended after the read is missed.
#[async_trait]
pub trait EventLog: Send + Sync {
    async fn append(&self, event: ReceivedEvent) -> Result<EventRecord, EventLogError>;

    /// Records at positions `cursor..`, in append order.
    async fn read_from(&self, cursor: usize) -> Result<Vec<EventRecord>, EventLogError>;

    async fn snapshot(&self) -> Result<Vec<EventRecord>, EventLogError> {
        self.read_from(0).await
    }

    async fn len(&self) -> Result<usize, EventLogError>;

    fn subscribe(&self) -> watch::Receiver<usize>;
}

pub mod in_memory;
