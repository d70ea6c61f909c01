use std::fmt;

/// Lifecycle of a single match query. Every state except `Pending` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryState {
    Pending,
    Satisfied,
    TimedOut,
    Cancelled,
    /// Only reachable with `CountPolicy::Exactly`.
    OverDelivered,
}

impl QueryState {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, QueryState::Pending)
    }
}

impl fmt::Display for QueryState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            QueryState::Pending => "pending",
            QueryState::Satisfied => "satisfied",
            QueryState::TimedOut => "timed out",
            QueryState::Cancelled => "cancelled",
            QueryState::OverDelivered => "over-delivered",
        };
        f.write_str(name)
    }
}
