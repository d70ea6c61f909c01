use crate::modules::recorded_events::use_cases::record_event::handler::RecordEventHandler;
use crate::shared::infrastructure::event_log::EventLog;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub recorder: RecordEventHandler,
    pub event_log: Arc<dyn EventLog>,
}
