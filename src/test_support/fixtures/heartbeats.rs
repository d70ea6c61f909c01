// Stand-in for the heartbeats workload wrapped by a container source.
//
// The workload posts one CloudEvent per beat to its sink. The source attribute identifies
// the pod it runs in and the data carries the `--msg` argument it was started with.

use crate::modules::recorded_events::core::event_record::ReceivedEvent;
use axum::body::Body;
use axum::http::Request;

pub const HEARTBEAT_EVENT_TYPE: &str = "dev.knative.eventing.samples.heartbeat";

pub fn heartbeat_source(namespace: &str, pod_name: &str) -> String {
    format!("https://knative.dev/eventing/test/heartbeats/#{namespace}/{pod_name}")
}

pub fn heartbeat_data(beat: u64, label: &str) -> String {
    serde_json::json!({ "id": beat, "label": label }).to_string()
}

pub fn heartbeat(namespace: &str, pod_name: &str, beat: u64, label: &str) -> ReceivedEvent {
    ReceivedEvent {
        id: Some(format!("{pod_name}-{beat}")),
        event_type: Some(HEARTBEAT_EVENT_TYPE.to_string()),
        source: heartbeat_source(namespace, pod_name),
        data: heartbeat_data(beat, label).into_bytes(),
    }
}

/// Binary content mode request, as the heartbeats image sends it.
pub fn heartbeat_request(namespace: &str, pod_name: &str, beat: u64, label: &str) -> Request<Body> {
    Request::post("/")
        .header("ce-specversion", "1.0")
        .header("ce-id", format!("{pod_name}-{beat}"))
        .header("ce-type", HEARTBEAT_EVENT_TYPE)
        .header("ce-source", heartbeat_source(namespace, pod_name))
        .header("content-type", "application/json")
        .body(Body::from(heartbeat_data(beat, label)))
        .unwrap()
}
