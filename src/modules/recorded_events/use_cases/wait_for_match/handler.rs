use crate::modules::recorded_events::core::deadline::Deadline;
use crate::modules::recorded_events::core::event_record::EventRecord;
use crate::modules::recorded_events::core::predicate::{CountVerdict, MatchPredicate};
use crate::modules::recorded_events::core::query_state::QueryState;
use crate::modules::recorded_events::core::tally::MatchTally;
use crate::modules::recorded_events::use_cases::wait_for_match::query::WaitForMatch;
use crate::shared::core::cancellation::Cancellation;
use crate::shared::infrastructure::event_log::{EventLog, EventLogError};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchReport {
    pub matched_count: usize,
    pub records: Vec<EventRecord>,
    pub inspected: usize,
}

impl MatchReport {
    pub fn state(&self) -> QueryState {
        QueryState::Satisfied
    }
}

impl From<MatchTally> for MatchReport {
    fn from(tally: MatchTally) -> Self {
        let inspected = tally.inspected();
        let records = tally.into_matched();
        Self {
            matched_count: records.len(),
            records,
            inspected,
        }
    }
}

#[derive(Debug, Error)]
pub enum QueryError {
    #[error("timed out {deadline} waiting for {predicate}: {observation}")]
    Timeout {
        predicate: MatchPredicate,
        deadline: Deadline,
        observation: MatchTally,
    },

    #[error("cancelled while waiting for {predicate}: {observation}")]
    Cancelled {
        predicate: MatchPredicate,
        observation: MatchTally,
    },

    #[error("over-delivered while waiting for {predicate}: {observation}")]
    OverDelivered {
        predicate: MatchPredicate,
        observation: MatchTally,
    },

    #[error("event store unavailable: {0}")]
    StoreUnavailable(#[from] EventLogError),
}

impl QueryError {
    /// Terminal state the query ended in. `None` when it never got to evaluate anything.
    pub fn state(&self) -> Option<QueryState> {
        match self {
            QueryError::Timeout { .. } => Some(QueryState::TimedOut),
            QueryError::Cancelled { .. } => Some(QueryState::Cancelled),
            QueryError::OverDelivered { .. } => Some(QueryState::OverDelivered),
            QueryError::StoreUnavailable(_) => None,
        }
    }

    pub fn observation(&self) -> Option<&MatchTally> {
        match self {
            QueryError::Timeout { observation, .. }
            | QueryError::Cancelled { observation, .. }
            | QueryError::OverDelivered { observation, .. } => Some(observation),
            QueryError::StoreUnavailable(_) => None,
        }
    }

    pub fn matched_count(&self) -> usize {
        self.observation().map_or(0, MatchTally::matched_count)
    }

    pub fn near_misses(&self) -> &[EventRecord] {
        match self.observation() {
            Some(observation) => observation.near_misses(),
            None => &[],
        }
    }
}

pub struct WaitForMatchHandler<TEventLog>
where
    TEventLog: EventLog + 'static,
{
    event_log: Arc<TEventLog>,
}

impl<TEventLog> WaitForMatchHandler<TEventLog>
where
    TEventLog: EventLog + 'static,
{
    pub fn new(event_log: Arc<TEventLog>) -> Self {
        Self { event_log }
    }

    /// Waits until the event log holds enough records matching the query's predicate.
    ///
    /// Records already in the log count, as do records appended while waiting. The wait
    /// wakes on every append and re-evaluates only records it has not inspected yet. When
    /// the deadline fires the log is read one last time before giving up.
    pub async fn handle(
        &self,
        query: WaitForMatch,
        cancellation: &Cancellation,
    ) -> Result<MatchReport, QueryError> {
        let WaitForMatch {
            predicate,
            deadline,
        } = query;
        let mut appended = self.event_log.subscribe();
        let mut tally = MatchTally::new();
        debug!(%predicate, %deadline, state = %QueryState::Pending, "waiting for matching events");

        loop {
            appended.borrow_and_update();
            for record in self.event_log.read_from(tally.inspected()).await? {
                tally.observe(&predicate, record);
            }

            let settled = predicate.count.settles_on_first_reach()
                || deadline.is_unbounded()
                || deadline.has_elapsed();
            match predicate.count.verdict(tally.matched_count()) {
                CountVerdict::Satisfied if settled => {
                    info!(
                        %predicate,
                        matched = tally.matched_count(),
                        state = %QueryState::Satisfied,
                        "expected events observed"
                    );
                    return Ok(MatchReport::from(tally));
                }
                CountVerdict::Exceeded => {
                    warn!(
                        %predicate,
                        matched = tally.matched_count(),
                        state = %QueryState::OverDelivered,
                        "more events than expected"
                    );
                    return Err(QueryError::OverDelivered {
                        predicate,
                        observation: tally,
                    });
                }
                CountVerdict::Satisfied => {
                    debug!(
                        %predicate,
                        matched = tally.matched_count(),
                        "exact count reached, watching for over-delivery until the deadline"
                    );
                }
                CountVerdict::Short => {}
            }

            if deadline.has_elapsed() {
                warn!(
                    %predicate,
                    %deadline,
                    matched = tally.matched_count(),
                    near_misses = tally.near_misses().len(),
                    state = %QueryState::TimedOut,
                    "gave up waiting for events"
                );
                return Err(QueryError::Timeout {
                    predicate,
                    deadline,
                    observation: tally,
                });
            }

            tokio::select! {
                biased;
                _ = cancellation.cancelled() => {
                    info!(
                        %predicate,
                        matched = tally.matched_count(),
                        state = %QueryState::Cancelled,
                        "wait cancelled"
                    );
                    return Err(QueryError::Cancelled {
                        predicate,
                        observation: tally,
                    });
                }
                // Falls through to the final read and the timeout above.
                _ = deadline.elapsed() => {}
                changed = appended.changed() => {
                    if changed.is_err() {
                        let closed = EventLogError::Unavailable("event log closed".into());
                        return Err(closed.into());
                    }
                }
            }
        }
    }
}

#[cfg(test)]
mod wait_for_match_handler_tests {
    use super::*;
    use crate::modules::recorded_events::core::predicate::{PayloadRule, SourceRule};
    use crate::shared::infrastructure::event_log::in_memory::InMemoryEventLog;
    use crate::test_support::fixtures::events::ReceivedEventBuilder;
    use rstest::{fixture, rstest};
    use std::time::Duration;
    use tokio::time::Instant;

    type Handler = WaitForMatchHandler<InMemoryEventLog>;

    #[fixture]
    fn before_each() -> (Arc<InMemoryEventLog>, Handler, Cancellation) {
        let log = Arc::new(InMemoryEventLog::new());
        let handler = WaitForMatchHandler::new(log.clone());
        (log, handler, Cancellation::new())
    }

    async fn append(log: &InMemoryEventLog, source: &str, data: &str) -> EventRecord {
        let event = ReceivedEventBuilder::new().source(source).data(data).build();
        log.append(event).await.expect("append failed")
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_succeed_trivially_when_nothing_is_required(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (log, handler, cancellation) = before_each;
        append(&log, "other", "data").await;
        let query = WaitForMatch::new(
            MatchPredicate::source_data("S", "X", 0),
            Deadline::immediate(),
        );
        let report = handler.handle(query, &cancellation).await.unwrap();
        assert_eq!(report.matched_count, 0);
        assert_eq!(report.state(), QueryState::Satisfied);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_succeed_trivially_on_an_empty_log(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (_, handler, cancellation) = before_each;
        let query = WaitForMatch::new(
            MatchPredicate::present(SourceRule::Any, PayloadRule::Any).at_least(0),
            Deadline::immediate(),
        );
        let report = handler.handle(query, &cancellation).await.unwrap();
        assert_eq!(report.inspected, 0);
        assert!(report.records.is_empty());
    }

    #[rstest]
    #[case(0, 0)]
    #[case(3, 0)]
    #[case(3, 2)]
    #[case(3, 3)]
    #[tokio::test(start_paused = true)]
    async fn it_should_return_every_matching_record_when_enough_are_present(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
        #[case] present: usize,
        #[case] required: usize,
    ) {
        let (log, handler, cancellation) = before_each;
        for i in 0..present {
            append(&log, "S", &format!("X-{i}")).await;
            append(&log, "T", "unrelated").await;
        }
        let query = WaitForMatch::new(
            MatchPredicate::source_data("S", "X", required),
            Deadline::unbounded(),
        );
        let report = handler.handle(query, &cancellation).await.unwrap();
        assert_eq!(report.matched_count, present);
        assert_eq!(report.records.len(), present);
        assert!(report.records.iter().all(|r| r.source == "S"));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_keep_waiting_without_deadline_when_too_few_are_present(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (log, handler, cancellation) = before_each;
        append(&log, "S", "X").await;
        let query = WaitForMatch::source_data("S", "X", 2, None);
        let waited = tokio::time::timeout(
            Duration::from_secs(24 * 3600),
            handler.handle(query, &cancellation),
        )
        .await;
        assert!(waited.is_err(), "query should still be pending");
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_be_satisfied_by_two_matching_records(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (log, handler, cancellation) = before_each;
        append(&log, "S", "payload with X inside").await;
        append(&log, "S", "X").await;
        let query = WaitForMatch::source_data("S", "X", 2, Some(Duration::from_secs(60)));
        let report = handler.handle(query, &cancellation).await.unwrap();
        assert_eq!(report.state(), QueryState::Satisfied);
        assert_eq!(report.matched_count, 2);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_time_out_with_the_partial_count(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (log, handler, cancellation) = before_each;
        append(&log, "S", "X").await;
        let started = Instant::now();
        let query = WaitForMatch::source_data("S", "X", 2, Some(Duration::from_secs(1)));
        let error = handler.handle(query, &cancellation).await.unwrap_err();
        assert_eq!(error.state(), Some(QueryState::TimedOut));
        assert_eq!(error.matched_count(), 1);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_report_records_from_the_wrong_source_as_near_misses(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (log, handler, cancellation) = before_each;
        let wrong_source = append(&log, "not-S", "X").await;
        append(&log, "not-S", "unrelated").await;
        let query = WaitForMatch::source_data("S", "X", 1, Some(Duration::from_secs(1)));
        let error = handler.handle(query, &cancellation).await.unwrap_err();
        assert!(matches!(error, QueryError::Timeout { .. }));
        assert_eq!(error.matched_count(), 0);
        assert_eq!(error.near_misses(), &[wrong_source]);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_explain_a_timeout_in_its_message(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (log, handler, cancellation) = before_each;
        append(&log, "S", "X").await;
        append(&log, "S", "Y").await;
        let query = WaitForMatch::source_data("S", "X", 2, Some(Duration::from_secs(1)));
        let message = handler
            .handle(query, &cancellation)
            .await
            .unwrap_err()
            .to_string();
        assert_eq!(
            message,
            r#"timed out within 1s waiting for source == "S" and data contains "X", at least 2 time(s): observed 1 matching record(s) out of 2 inspected; matched: [#0 source="S" data="X"]; near misses: [#1 source="S" data="Y"]"#
        );
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_wake_up_on_append_instead_of_waiting_for_the_deadline(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (log, handler, cancellation) = before_each;
        let started = Instant::now();
        let emitter = {
            let log = log.clone();
            tokio::spawn(async move {
                for beat in 0..2 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    append(&log, "S", &format!("X-{beat}")).await;
                }
            })
        };
        let query = WaitForMatch::source_data("S", "X", 2, Some(Duration::from_secs(60)));
        let report = handler.handle(query, &cancellation).await.unwrap();
        emitter.await.unwrap();
        assert_eq!(report.matched_count, 2);
        assert!(started.elapsed() < Duration::from_secs(11));
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_stop_waiting_when_cancelled(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (log, handler, cancellation) = before_each;
        append(&log, "S", "X").await;
        let canceller = {
            let cancellation = cancellation.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_secs(1)).await;
                cancellation.cancel();
            })
        };
        let query = WaitForMatch::source_data("S", "X", 2, None);
        let error = handler.handle(query, &cancellation).await.unwrap_err();
        canceller.await.unwrap();
        assert_eq!(error.state(), Some(QueryState::Cancelled));
        assert_eq!(error.matched_count(), 1);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_flag_over_delivery_when_exact_count_is_required(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (log, handler, cancellation) = before_each;
        for _ in 0..3 {
            append(&log, "S", "X").await;
        }
        let query = WaitForMatch::new(
            MatchPredicate::source_data("S", "X", 2).exactly(2),
            Deadline::within(Duration::from_secs(1)),
        );
        let error = handler.handle(query, &cancellation).await.unwrap_err();
        assert_eq!(error.state(), Some(QueryState::OverDelivered));
        assert_eq!(error.matched_count(), 3);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_accept_the_exact_count() {
        let log = Arc::new(InMemoryEventLog::new());
        let handler = WaitForMatchHandler::new(log.clone());
        append(&log, "S", "X").await;
        append(&log, "S", "X").await;
        let query = WaitForMatch::new(
            MatchPredicate::source_data("S", "X", 2).exactly(2),
            Deadline::immediate(),
        );
        let report = handler.handle(query, &Cancellation::new()).await.unwrap();
        assert_eq!(report.matched_count, 2);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_flag_over_delivery_arriving_after_the_exact_count_was_reached(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (log, handler, cancellation) = before_each;
        append(&log, "S", "X").await;
        append(&log, "S", "X").await;
        let late = {
            let log = log.clone();
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                append(&log, "S", "X").await;
            })
        };
        let query = WaitForMatch::new(
            MatchPredicate::source_data("S", "X", 2).exactly(2),
            Deadline::within(Duration::from_secs(1)),
        );
        let error = handler.handle(query, &cancellation).await.unwrap_err();
        late.await.unwrap();
        assert_eq!(error.state(), Some(QueryState::OverDelivered));
        assert_eq!(error.matched_count(), 3);
    }

    #[rstest]
    #[tokio::test(start_paused = true)]
    async fn it_should_confirm_the_exact_count_once_the_deadline_passes(
        before_each: (Arc<InMemoryEventLog>, Handler, Cancellation),
    ) {
        let (log, handler, cancellation) = before_each;
        append(&log, "S", "X").await;
        append(&log, "S", "X").await;
        let started = Instant::now();
        let query = WaitForMatch::new(
            MatchPredicate::source_data("S", "X", 2).exactly(2),
            Deadline::within(Duration::from_secs(1)),
        );
        let report = handler.handle(query, &cancellation).await.unwrap();
        assert_eq!(report.matched_count, 2);
        assert!(started.elapsed() >= Duration::from_secs(1));
    }

    #[rstest]
    #[tokio::test]
    async fn it_should_fail_when_the_event_log_is_offline() {
        let mut log = InMemoryEventLog::new();
        log.toggle_offline();
        let handler = WaitForMatchHandler::new(Arc::new(log));
        let query = WaitForMatch::source_data("S", "X", 0, None);
        let error = handler
            .handle(query, &Cancellation::new())
            .await
            .unwrap_err();
        assert!(matches!(
            error,
            QueryError::StoreUnavailable(EventLogError::Unavailable(_))
        ));
        assert_eq!(error.state(), None);
        assert_eq!(
            error.to_string(),
            "event store unavailable: event log unavailable: Event log offline"
        );
    }

    #[rstest]
    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn it_should_count_exactly_under_concurrent_appends_and_queries() {
        const WRITERS: usize = 8;
        const PER_WRITER: usize = 40;
        let expected = WRITERS * PER_WRITER / 2;

        let log = Arc::new(InMemoryEventLog::new());
        let handler = Arc::new(WaitForMatchHandler::new(log.clone()));
        let cancellation = Cancellation::new();

        let queries: Vec<_> = (0..4)
            .map(|_| {
                let handler = handler.clone();
                let cancellation = cancellation.clone();
                tokio::spawn(async move {
                    let query = WaitForMatch::source_data(
                        "S",
                        "X",
                        expected,
                        Some(Duration::from_secs(30)),
                    );
                    handler.handle(query, &cancellation).await
                })
            })
            .collect();

        let writers: Vec<_> = (0..WRITERS)
            .map(|writer| {
                let log = log.clone();
                tokio::spawn(async move {
                    for i in 0..PER_WRITER {
                        let data = if i % 2 == 0 { "X" } else { "Y" };
                        append(&log, "S", &format!("{writer}-{i}-{data}")).await;
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();

        for writer in writers {
            writer.await.unwrap();
        }
        for query in queries {
            let report = query.await.unwrap().expect("query should be satisfied");
            assert_eq!(report.matched_count, expected);
        }

        let late = WaitForMatch::source_data("S", "X", expected, Some(Duration::ZERO));
        let report = handler.handle(late, &cancellation).await.unwrap();
        assert_eq!(report.matched_count, expected);
        assert_eq!(report.inspected, WRITERS * PER_WRITER);
    }
}
