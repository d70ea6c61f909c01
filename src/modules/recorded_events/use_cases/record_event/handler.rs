// Ingestion pipeline between a receiver and the event log.
//
// Receivers hand events to a RecordEventHandler, which queues them on a bounded channel.
// A single pump task drains the channel into the event log in arrival order. On shutdown
// the pump stops accepting, drains what is already queued and exits.

use crate::modules::recorded_events::core::event_record::ReceivedEvent;
use crate::shared::core::cancellation::Cancellation;
use crate::shared::infrastructure::event_log::EventLog;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    #[error("recording endpoint is closed")]
    Closed,
}

#[derive(Clone)]
pub struct RecordEventHandler {
    sender: mpsc::Sender<ReceivedEvent>,
    shutdown: Cancellation,
}

impl RecordEventHandler {
    pub async fn handle(&self, event: ReceivedEvent) -> Result<(), RecordError> {
        if self.shutdown.is_cancelled() {
            return Err(RecordError::Closed);
        }
        self.sender
            .send(event)
            .await
            .map_err(|_| RecordError::Closed)
    }
}

pub fn spawn_ingestion<TEventLog>(
    event_log: Arc<TEventLog>,
    capacity: usize,
    shutdown: Cancellation,
) -> (RecordEventHandler, JoinHandle<()>)
where
    TEventLog: EventLog + 'static,
{
    let (sender, receiver) = mpsc::channel(capacity.max(1));
    let pump = tokio::spawn(run_ingestion(event_log, receiver, shutdown.clone()));
    (RecordEventHandler { sender, shutdown }, pump)
}

async fn run_ingestion<TEventLog>(
    event_log: Arc<TEventLog>,
    mut receiver: mpsc::Receiver<ReceivedEvent>,
    shutdown: Cancellation,
) where
    TEventLog: EventLog + 'static,
{
    info!("ingestion started");
    loop {
        tokio::select! {
            biased;
            next = receiver.recv() => match next {
                Some(event) => ingest(&*event_log, event).await,
                None => break,
            },
            _ = shutdown.cancelled() => {
                receiver.close();
                let mut drained = 0usize;
                while let Some(event) = receiver.recv().await {
                    ingest(&*event_log, event).await;
                    drained += 1;
                }
                debug!(drained, "ingestion drained queued events");
                break;
            }
        }
    }
    info!("ingestion stopped");
}

async fn ingest(event_log: &impl EventLog, event: ReceivedEvent) {
    let source = event.source.clone();
    match event_log.append(event).await {
        Ok(record) => debug!(sequence = record.sequence, %source, "event recorded"),
        Err(e) => warn!(error = %e, %source, "event log rejected event"),
    }
}
