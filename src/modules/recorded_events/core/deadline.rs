use std::fmt;
use std::time::Duration;
use tokio::time::Instant;

/// Point in time by which a match query has to be satisfied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Wait until the query is cancelled from the outside.
    Unbounded,
    At { instant: Instant, budget: Duration },
}

impl Deadline {
    pub fn within(budget: Duration) -> Self {
        Deadline::At {
            instant: Instant::now() + budget,
            budget,
        }
    }

    pub fn immediate() -> Self {
        Self::within(Duration::ZERO)
    }

    pub fn unbounded() -> Self {
        Deadline::Unbounded
    }

    /// `None` means no deadline at all.
    pub fn from_timeout(timeout: Option<Duration>) -> Self {
        timeout.map_or(Deadline::Unbounded, Self::within)
    }

    pub fn is_unbounded(&self) -> bool {
        matches!(self, Deadline::Unbounded)
    }

    pub fn has_elapsed(&self) -> bool {
        match self {
            Deadline::Unbounded => false,
            Deadline::At { instant, .. } => Instant::now() >= *instant,
        }
    }

    /// Resolves when the deadline passes. Never resolves for `Unbounded`.
    pub async fn elapsed(&self) {
        match self {
            Deadline::Unbounded => std::future::pending::<()>().await,
            Deadline::At { instant, .. } => tokio::time::sleep_until(*instant).await,
        }
    }
}

impl fmt::Display for Deadline {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Deadline::Unbounded => write!(f, "without deadline"),
            Deadline::At { budget, .. } => write!(f, "within {budget:?}"),
        }
    }
}
