// Matching rules for recorded events.
//
// Purpose
// - Describe what a test expects to have been delivered: which source, which payload, how often.
//
// Responsibilities
// - Classify a single record as a full match, a near miss (one side matched) or unrelated.
// - Decide whether a running match count satisfies the expected cardinality.
//
// Boundaries
// - Pure functions only. Waiting and deadlines live in the wait_for_match use case.

use crate::modules::recorded_events::core::event_record::EventRecord;
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceRule {
    Any,
    Exact(String),
    Prefix(String),
}

impl SourceRule {
    pub fn matches(&self, source: &str) -> bool {
        match self {
            SourceRule::Any => true,
            SourceRule::Exact(expected) => source == expected,
            SourceRule::Prefix(prefix) => source.starts_with(prefix.as_str()),
        }
    }
}

impl fmt::Display for SourceRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceRule::Any => write!(f, "any source"),
            SourceRule::Exact(expected) => write!(f, "source == {expected:?}"),
            SourceRule::Prefix(prefix) => write!(f, "source starts with {prefix:?}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PayloadRule {
    Any,
    Equals(Vec<u8>),
    Contains(Vec<u8>),
}

impl PayloadRule {
    pub fn matches(&self, data: &[u8]) -> bool {
        match self {
            PayloadRule::Any => true,
            PayloadRule::Equals(expected) => data == expected.as_slice(),
            PayloadRule::Contains(fragment) => contains(data, fragment),
        }
    }
}

impl fmt::Display for PayloadRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PayloadRule::Any => write!(f, "any data"),
            PayloadRule::Equals(expected) => {
                write!(f, "data == {:?}", String::from_utf8_lossy(expected))
            }
            PayloadRule::Contains(fragment) => {
                write!(f, "data contains {:?}", String::from_utf8_lossy(fragment))
            }
        }
    }
}

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    needle.is_empty()
        || haystack
            .windows(needle.len())
            .any(|window| window == needle)
}

/// Expected cardinality of matching records.
///
/// `AtLeast` is satisfied the moment `n` matching records have been observed. `Exactly` flags
/// over-delivery: it fails as soon as more than `n` matching records have been observed, and
/// under a bounded deadline it only reports success once the deadline has passed with the
/// count still at `n`. Under an unbounded deadline `Exactly` succeeds on first reaching `n`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountPolicy {
    AtLeast(usize),
    Exactly(usize),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountVerdict {
    Short,
    Satisfied,
    Exceeded,
}

impl CountPolicy {
    pub fn required(&self) -> usize {
        match self {
            CountPolicy::AtLeast(n) | CountPolicy::Exactly(n) => *n,
        }
    }

    /// Whether reaching the count is final, or later records can still turn it into a failure.
    pub fn settles_on_first_reach(&self) -> bool {
        matches!(self, CountPolicy::AtLeast(_))
    }

    pub fn verdict(&self, observed: usize) -> CountVerdict {
        match *self {
            CountPolicy::AtLeast(n) if observed >= n => CountVerdict::Satisfied,
            CountPolicy::Exactly(n) if observed == n => CountVerdict::Satisfied,
            CountPolicy::Exactly(n) if observed > n => CountVerdict::Exceeded,
            _ => CountVerdict::Short,
        }
    }
}

impl fmt::Display for CountPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CountPolicy::AtLeast(n) => write!(f, "at least {n} time(s)"),
            CountPolicy::Exactly(n) => write!(f, "exactly {n} time(s)"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordMatch {
    Full,
    SourceOnly,
    PayloadOnly,
    Unrelated,
}

impl RecordMatch {
    pub fn is_near_miss(&self) -> bool {
        matches!(self, RecordMatch::SourceOnly | RecordMatch::PayloadOnly)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MatchPredicate {
    pub source: SourceRule,
    pub payload: PayloadRule,
    pub count: CountPolicy,
}

impl MatchPredicate {
    /// A predicate satisfied by a single matching record.
    pub fn present(source: SourceRule, payload: PayloadRule) -> Self {
        Self {
            source,
            payload,
            count: CountPolicy::AtLeast(1),
        }
    }

    /// Exact source and payload fragment, seen at least `count` times.
    pub fn source_data(
        source: impl Into<String>,
        data: impl Into<Vec<u8>>,
        count: usize,
    ) -> Self {
        Self {
            source: SourceRule::Exact(source.into()),
            payload: PayloadRule::Contains(data.into()),
            count: CountPolicy::AtLeast(count),
        }
    }

    pub fn at_least(mut self, n: usize) -> Self {
        self.count = CountPolicy::AtLeast(n);
        self
    }

    pub fn exactly(mut self, n: usize) -> Self {
        self.count = CountPolicy::Exactly(n);
        self
    }

    pub fn evaluate(&self, record: &EventRecord) -> RecordMatch {
        match (
            self.source.matches(&record.source),
            self.payload.matches(&record.data),
        ) {
            (true, true) => RecordMatch::Full,
            (true, false) => RecordMatch::SourceOnly,
            (false, true) => RecordMatch::PayloadOnly,
            (false, false) => RecordMatch::Unrelated,
        }
    }
}

impl fmt::Display for MatchPredicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} and {}, {}", self.source, self.payload, self.count)
    }
}
