use axum::{
    Router,
    routing::{get, post},
};
use tower_http::trace::TraceLayer;

use crate::modules::recorded_events::use_cases::list_recorded_events::inbound::http as list_http;
use crate::modules::recorded_events::use_cases::record_event::inbound::http as record_http;
use crate::shell::state::AppState;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", post(record_http::handle))
        .route("/events", get(list_http::handle))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
