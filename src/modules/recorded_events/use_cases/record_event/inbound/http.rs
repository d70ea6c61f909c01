use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::warn;

use crate::modules::recorded_events::use_cases::record_event::cloud_event;
use crate::modules::recorded_events::use_cases::record_event::handler::RecordError;
use crate::shell::state::AppState;

pub async fn handle(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> impl IntoResponse {
    let event = match cloud_event::decode(&headers, &body) {
        Ok(event) => event,
        Err(e) => {
            warn!(error = %e, "rejected undecodable event");
            return (StatusCode::BAD_REQUEST, e.to_string()).into_response();
        }
    };

    match state.recorder.handle(event).await {
        Ok(()) => StatusCode::ACCEPTED.into_response(),
        Err(RecordError::Closed) => StatusCode::SERVICE_UNAVAILABLE.into_response(),
    }
}
