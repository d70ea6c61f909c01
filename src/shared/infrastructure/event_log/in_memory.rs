// In memory implementation of the EventLog port.
//
// Purpose
// - Hold everything a recording endpoint received during one test run.
//
// Responsibilities
// - Stamp sequence and ingestion time under the write lock, so order equals append order.
// - Publish the log length after every append to wake waiting queries.

use crate::modules::recorded_events::core::event_record::{EventRecord, ReceivedEvent};
use crate::shared::infrastructure::event_log::{EventLog, EventLogError};
use chrono::Utc;
use tokio::sync::{RwLock, watch};

pub struct InMemoryEventLog {
    records: RwLock<Vec<EventRecord>>,
    appended: watch::Sender<usize>,
    is_offline: bool,
}

impl Default for InMemoryEventLog {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryEventLog {
    pub fn new() -> Self {
        let (appended, _) = watch::channel(0);
        Self {
            records: RwLock::new(Vec::new()),
            appended,
            is_offline: false,
        }
    }

    pub fn toggle_offline(&mut self) {
        self.is_offline = !self.is_offline;
    }

    fn ensure_online(&self) -> Result<(), EventLogError> {
        if self.is_offline {
            return Err(EventLogError::Unavailable("Event log offline".into()));
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl EventLog for InMemoryEventLog {
    async fn append(&self, event: ReceivedEvent) -> Result<EventRecord, EventLogError> {
        self.ensure_online()?;
        let mut guard = self.records.write().await;
        let observed_at = Utc::now().timestamp_millis();
        let record = event.into_record(guard.len() as u64, observed_at);
        guard.push(record.clone());
        self.appended.send_replace(guard.len());
        Ok(record)
    }

    async fn read_from(&self, cursor: usize) -> Result<Vec<EventRecord>, EventLogError> {
        self.ensure_online()?;
        let guard = self.records.read().await;
        Ok(guard.get(cursor..).map(<[_]>::to_vec).unwrap_or_default())
    }

    async fn len(&self) -> Result<usize, EventLogError> {
        self.ensure_online()?;
        Ok(self.records.read().await.len())
    }

    fn subscribe(&self) -> watch::Receiver<usize> {
        self.appended.subscribe()
    }
}
