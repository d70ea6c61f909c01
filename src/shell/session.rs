// One recording session per test run.
//
// Owns the event log, the ingestion pump and, when started with a listener, the HTTP
// recording endpoint. Everything it spawned stops when the session is cleaned up, which
// happens explicitly through `cleanup` or `release`, or implicitly when the session is
// dropped. Only `release` waits for the spawned tasks to finish.

use crate::config::RecorderConfig;
use crate::modules::recorded_events::core::deadline::Deadline;
use crate::modules::recorded_events::core::event_record::EventRecord;
use crate::modules::recorded_events::core::predicate::MatchPredicate;
use crate::modules::recorded_events::use_cases::record_event::handler::{
    RecordEventHandler, spawn_ingestion,
};
use crate::modules::recorded_events::use_cases::wait_for_match::handler::{
    MatchReport, QueryError, WaitForMatchHandler,
};
use crate::modules::recorded_events::use_cases::wait_for_match::query::WaitForMatch;
use crate::shared::core::cancellation::Cancellation;
use crate::shared::infrastructure::event_log::in_memory::InMemoryEventLog;
use crate::shared::infrastructure::event_log::{EventLog, EventLogError};
use crate::shell::http::router;
use crate::shell::state::AppState;
use axum::Router;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("recording endpoint unavailable on {addr}: {source}")]
    StoreUnavailable {
        addr: SocketAddr,
        source: std::io::Error,
    },
}

pub struct RecordingSession {
    id: Uuid,
    event_log: Arc<InMemoryEventLog>,
    recorder: RecordEventHandler,
    queries: WaitForMatchHandler<InMemoryEventLog>,
    shutdown: Cancellation,
    local_addr: Option<SocketAddr>,
    server: Mutex<Option<JoinHandle<()>>>,
    pump: Mutex<Option<JoinHandle<()>>>,
}

impl RecordingSession {
    /// Session without a listener. Events enter through `recorder` or `router`.
    pub fn in_process(config: &RecorderConfig) -> Self {
        let id = Uuid::now_v7();
        let event_log = Arc::new(InMemoryEventLog::new());
        let shutdown = Cancellation::new();
        let (recorder, pump) = spawn_ingestion(
            event_log.clone(),
            config.channel_capacity,
            shutdown.clone(),
        );
        info!(session = %id, "recording session started");
        Self {
            id,
            queries: WaitForMatchHandler::new(event_log.clone()),
            event_log,
            recorder,
            shutdown,
            local_addr: None,
            server: Mutex::new(None),
            pump: Mutex::new(Some(pump)),
        }
    }

    /// Session serving the recording endpoint on `config.listen_addr`.
    pub async fn start(config: &RecorderConfig) -> Result<Self, SessionError> {
        let unavailable = |source| SessionError::StoreUnavailable {
            addr: config.listen_addr,
            source,
        };
        let listener = TcpListener::bind(config.listen_addr)
            .await
            .map_err(unavailable)?;
        let local_addr = listener.local_addr().map_err(unavailable)?;

        let mut session = Self::in_process(config);
        session.local_addr = Some(local_addr);

        let app = session.router();
        let shutdown = session.shutdown.clone();
        let id = session.id;
        let server = tokio::spawn(async move {
            let served = axum::serve(listener, app)
                .with_graceful_shutdown(async move { shutdown.cancelled().await })
                .await;
            match served {
                Ok(()) => debug!(session = %id, "recording endpoint stopped"),
                Err(e) => warn!(session = %id, error = %e, "recording endpoint failed"),
            }
        });
        *session.server.get_mut() = Some(server);
        info!(session = %id, %local_addr, "recording endpoint listening");
        Ok(session)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    pub fn state(&self) -> AppState {
        AppState {
            recorder: self.recorder.clone(),
            event_log: self.event_log.clone(),
        }
    }

    pub fn router(&self) -> Router {
        router(self.state())
    }

    pub fn recorder(&self) -> &RecordEventHandler {
        &self.recorder
    }

    pub fn event_log(&self) -> &Arc<InMemoryEventLog> {
        &self.event_log
    }

    pub async fn snapshot(&self) -> Result<Vec<EventRecord>, EventLogError> {
        self.event_log.snapshot().await
    }

    pub fn subscribe(&self) -> watch::Receiver<usize> {
        self.event_log.subscribe()
    }

    /// Waits for `predicate`. Cleaning up the session cancels the wait.
    pub async fn wait_for(
        &self,
        predicate: MatchPredicate,
        deadline: Deadline,
    ) -> Result<MatchReport, QueryError> {
        self.queries
            .handle(WaitForMatch::new(predicate, deadline), &self.shutdown)
            .await
    }

    /// Waits for `predicate` until either `cancellation` or the session's cleanup cancels it.
    pub async fn wait_for_cancellable(
        &self,
        predicate: MatchPredicate,
        deadline: Deadline,
        cancellation: &Cancellation,
    ) -> Result<MatchReport, QueryError> {
        let query = Cancellation::new();
        let linked = async {
            tokio::select! {
                _ = self.shutdown.cancelled() => {}
                _ = cancellation.cancelled() => {}
            }
            query.cancel();
        };
        let waiting = self
            .queries
            .handle(WaitForMatch::new(predicate, deadline), &query);
        tokio::pin!(waiting);
        tokio::select! {
            biased;
            result = &mut waiting => return result,
            _ = linked => {}
        }
        waiting.await
    }

    /// Waits until `data` shows up in at least `count` events from exactly `source`.
    /// A `timeout` of `None` waits until the session is cleaned up.
    pub async fn wait_match_source_data(
        &self,
        source: &str,
        data: &str,
        count: usize,
        timeout: Option<Duration>,
    ) -> Result<MatchReport, QueryError> {
        self.queries
            .handle(
                WaitForMatch::source_data(source, data, count, timeout),
                &self.shutdown,
            )
            .await
    }

    pub fn cleanup(&self) {
        if self.shutdown.cancel() {
            info!(session = %self.id, "recording session cleaned up");
        } else {
            debug!(session = %self.id, "recording session already cleaned up");
        }
    }

    /// Cleans up, then waits for the endpoint to stop and for the ingestion pump to drain.
    /// Every event accepted before the call is in the log once this returns.
    pub async fn release(&self) {
        self.cleanup();
        let mut server = self.server.lock().await;
        if let Some(task) = server.take() {
            if let Err(e) = task.await {
                warn!(session = %self.id, error = %e, "recording endpoint task failed");
            }
        }
        let mut pump = self.pump.lock().await;
        if let Some(task) = pump.take() {
            if let Err(e) = task.await {
                warn!(session = %self.id, error = %e, "ingestion task failed");
            }
        }
        debug!(session = %self.id, "recording session released");
    }

    pub fn is_cleaned_up(&self) -> bool {
        self.shutdown.is_cancelled()
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        self.cleanup();
    }
}
