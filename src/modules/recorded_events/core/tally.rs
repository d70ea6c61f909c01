// Running tally of what a match query has seen so far.
//
// Records are immutable once appended, so a verdict on record #k never changes.
// The tally therefore only ever looks at records it has not inspected yet.

use crate::modules::recorded_events::core::event_record::EventRecord;
use crate::modules::recorded_events::core::predicate::{MatchPredicate, RecordMatch};
use std::fmt;

const DIAGNOSTIC_LISTING_LIMIT: usize = 10;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MatchTally {
    matched: Vec<EventRecord>,
    near_misses: Vec<EventRecord>,
    inspected: usize,
}

impl MatchTally {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, predicate: &MatchPredicate, record: EventRecord) {
        self.inspected += 1;
        match predicate.evaluate(&record) {
            RecordMatch::Full => self.matched.push(record),
            m if m.is_near_miss() => self.near_misses.push(record),
            _ => {}
        }
    }

    /// Number of records looked at, which is also the cursor of the next unread record.
    pub fn inspected(&self) -> usize {
        self.inspected
    }

    pub fn matched_count(&self) -> usize {
        self.matched.len()
    }

    pub fn matched(&self) -> &[EventRecord] {
        &self.matched
    }

    pub fn near_misses(&self) -> &[EventRecord] {
        &self.near_misses
    }

    pub fn into_matched(self) -> Vec<EventRecord> {
        self.matched
    }
}

fn write_listing(f: &mut fmt::Formatter<'_>, label: &str, records: &[EventRecord]) -> fmt::Result {
    if records.is_empty() {
        return Ok(());
    }
    write!(f, "; {label}:")?;
    for record in records.iter().take(DIAGNOSTIC_LISTING_LIMIT) {
        write!(f, " [{record}]")?;
    }
    if records.len() > DIAGNOSTIC_LISTING_LIMIT {
        write!(f, " and {} more", records.len() - DIAGNOSTIC_LISTING_LIMIT)?;
    }
    Ok(())
}

impl fmt::Display for MatchTally {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "observed {} matching record(s) out of {} inspected",
            self.matched.len(),
            self.inspected
        )?;
        write_listing(f, "matched", &self.matched)?;
        write_listing(f, "near misses", &self.near_misses)
    }
}
