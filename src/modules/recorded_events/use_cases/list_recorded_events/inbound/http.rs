use axum::{
    Json,
    extract::{Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::{Deserialize, Serialize};

use crate::modules::recorded_events::core::event_record::EventRecord;
use crate::shell::state::AppState;

#[derive(Deserialize)]
pub struct ListRecordedEventsParams {
    pub from: Option<usize>,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct RecordedEventView {
    pub sequence: u64,
    pub observed_at: i64,
    pub id: Option<String>,
    #[serde(rename = "type")]
    pub event_type: Option<String>,
    pub source: String,
    pub data: String,
}

impl From<EventRecord> for RecordedEventView {
    fn from(record: EventRecord) -> Self {
        let data = record.data_lossy();
        Self {
            sequence: record.sequence,
            observed_at: record.observed_at,
            id: record.id,
            event_type: record.event_type,
            source: record.source,
            data,
        }
    }
}

pub async fn handle(
    State(state): State<AppState>,
    Query(params): Query<ListRecordedEventsParams>,
) -> impl IntoResponse {
    match state.event_log.read_from(params.from.unwrap_or(0)).await {
        Ok(records) => Json(
            records
                .into_iter()
                .map(RecordedEventView::from)
                .collect::<Vec<_>>(),
        )
        .into_response(),
        Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}
