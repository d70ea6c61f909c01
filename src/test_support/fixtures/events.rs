use crate::modules::recorded_events::core::event_record::{EventRecord, ReceivedEvent};

pub struct ReceivedEventBuilder {
    inner: ReceivedEvent,
}

impl Default for ReceivedEventBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl ReceivedEventBuilder {
    pub fn new() -> Self {
        Self {
            inner: ReceivedEvent {
                id: None,
                event_type: None,
                source: "source-fixed-0001".to_string(),
                data: b"data-fixed-0001".to_vec(),
            },
        }
    }

    pub fn id(mut self, v: impl Into<String>) -> Self {
        self.inner.id = Some(v.into());
        self
    }

    pub fn event_type(mut self, v: impl Into<String>) -> Self {
        self.inner.event_type = Some(v.into());
        self
    }

    pub fn source(mut self, v: impl Into<String>) -> Self {
        self.inner.source = v.into();
        self
    }

    pub fn data(mut self, v: impl Into<Vec<u8>>) -> Self {
        self.inner.data = v.into();
        self
    }

    pub fn build(self) -> ReceivedEvent {
        self.inner
    }
}

pub struct EventRecordBuilder {
    event: ReceivedEventBuilder,
    sequence: u64,
    observed_at: i64,
}

impl Default for EventRecordBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[allow(dead_code)]
impl EventRecordBuilder {
    pub fn new() -> Self {
        Self {
            event: ReceivedEventBuilder::new(),
            sequence: 0,
            observed_at: 1_700_000_000_000,
        }
    }

    pub fn sequence(mut self, v: u64) -> Self {
        self.sequence = v;
        self
    }

    pub fn observed_at(mut self, v: i64) -> Self {
        self.observed_at = v;
        self
    }

    pub fn source(mut self, v: impl Into<String>) -> Self {
        self.event = self.event.source(v);
        self
    }

    pub fn data(mut self, v: impl Into<Vec<u8>>) -> Self {
        self.event = self.event.data(v);
        self
    }

    pub fn build(self) -> EventRecord {
        self.event
            .build()
            .into_record(self.sequence, self.observed_at)
    }
}
