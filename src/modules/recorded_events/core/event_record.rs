use std::fmt;

/// An event as handed over by a receiver, before the event log has accepted it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceivedEvent {
    pub id: Option<String>,
    pub event_type: Option<String>,
    pub source: String,
    pub data: Vec<u8>,
}

impl ReceivedEvent {
    pub fn new(source: impl Into<String>, data: impl Into<Vec<u8>>) -> Self {
        Self {
            id: None,
            event_type: None,
            source: source.into(),
            data: data.into(),
        }
    }

    pub fn into_record(self, sequence: u64, observed_at: i64) -> EventRecord {
        EventRecord {
            sequence,
            observed_at,
            id: self.id,
            event_type: self.event_type,
            source: self.source,
            data: self.data,
        }
    }
}

/// An event accepted by the event log. Immutable once appended.
///
/// `sequence` is the position in the log and is the only authoritative ordering;
/// `observed_at` is the wall clock time of ingestion in unix milliseconds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub sequence: u64,
    pub observed_at: i64,
    pub id: Option<String>,
    pub event_type: Option<String>,
    pub source: String,
    pub data: Vec<u8>,
}

impl EventRecord {
    pub fn data_lossy(&self) -> String {
        String::from_utf8_lossy(&self.data).into_owned()
    }
}

impl fmt::Display for EventRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "#{} source={:?} data={:?}",
            self.sequence,
            self.source,
            self.data_lossy()
        )?;
        if let Some(id) = &self.id {
            write!(f, " id={id:?}")?;
        }
        if let Some(event_type) = &self.event_type {
            write!(f, " type={event_type:?}")?;
        }
        Ok(())
    }
}
