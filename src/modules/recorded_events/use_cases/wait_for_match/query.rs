use crate::modules::recorded_events::core::deadline::Deadline;
use crate::modules::recorded_events::core::predicate::MatchPredicate;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WaitForMatch {
    pub predicate: MatchPredicate,
    pub deadline: Deadline,
}

impl WaitForMatch {
    pub fn new(predicate: MatchPredicate, deadline: Deadline) -> Self {
        Self {
            predicate,
            deadline,
        }
    }

    /// Exact source, payload fragment, at least `count` occurrences. `None` waits forever.
    pub fn source_data(
        source: impl Into<String>,
        data: impl Into<Vec<u8>>,
        count: usize,
        timeout: Option<Duration>,
    ) -> Self {
        Self::new(
            MatchPredicate::source_data(source, data, count),
            Deadline::from_timeout(timeout),
        )
    }
}
