use crate::config::RecorderConfig;
use crate::modules::recorded_events::core::query_state::QueryState;
use crate::shell::session::RecordingSession;
use crate::test_support::fixtures::heartbeats::{heartbeat_request, heartbeat_source};
use axum::Router;
use std::time::Duration;
use tokio::task::JoinHandle;
use tower::ServiceExt;
use uuid::Uuid;

const NAMESPACE: &str = "test-container-source";

/// Heartbeats workload posting to the recording endpoint until the endpoint refuses.
fn spawn_heartbeats(app: Router, pod_name: &'static str, label: String) -> JoinHandle<u64> {
    tokio::spawn(async move {
        let mut beat = 0;
        loop {
            beat += 1;
            let request = heartbeat_request(NAMESPACE, pod_name, beat, &label);
            let response = app
                .clone()
                .oneshot(request)
                .await
                .unwrap_or_else(|never| match never {});
            if !response.status().is_success() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        beat - 1
    })
}

#[tokio::test]
async fn heartbeats_from_a_container_source_reach_the_sink() {
    let session = RecordingSession::in_process(&RecorderConfig::ephemeral());
    let label = Uuid::now_v7().to_string();
    let workload = spawn_heartbeats(session.router(), "heartbeats", label.clone());

    let source = heartbeat_source(NAMESPACE, "heartbeats");
    let report = session
        .wait_match_source_data(&source, &label, 2, Some(Duration::from_secs(60)))
        .await
        .unwrap();

    assert_eq!(report.state(), QueryState::Satisfied);
    assert!(report.matched_count >= 2);
    assert!(report.records.iter().all(|record| record.source == source));

    session.cleanup();
    let delivered = workload.await.unwrap();
    assert!(delivered >= 2);
}

#[tokio::test]
async fn heartbeats_from_another_pod_time_out_as_near_misses() {
    let session = RecordingSession::in_process(&RecorderConfig::ephemeral());
    let label = Uuid::now_v7().to_string();
    let _workload = spawn_heartbeats(session.router(), "someone-else", label.clone());

    let expected_source = heartbeat_source(NAMESPACE, "heartbeats");
    let error = session
        .wait_match_source_data(&expected_source, &label, 2, Some(Duration::from_millis(200)))
        .await
        .unwrap_err();

    assert_eq!(error.state(), Some(QueryState::TimedOut));
    assert_eq!(error.matched_count(), 0);
    assert!(!error.near_misses().is_empty());
    let message = error.to_string();
    assert!(message.starts_with("timed out within 200ms"));
    assert!(message.contains(&heartbeat_source(NAMESPACE, "someone-else")));
}

#[tokio::test]
async fn each_session_only_sees_its_own_heartbeats() {
    let first = RecordingSession::in_process(&RecorderConfig::ephemeral());
    let first_label = Uuid::now_v7().to_string();
    let first_workload = spawn_heartbeats(first.router(), "heartbeats", first_label.clone());
    let source = heartbeat_source(NAMESPACE, "heartbeats");
    first
        .wait_match_source_data(&source, &first_label, 2, Some(Duration::from_secs(60)))
        .await
        .unwrap();
    drop(first);
    first_workload.await.unwrap();

    let second = RecordingSession::in_process(&RecorderConfig::ephemeral());
    let error = second
        .wait_match_source_data(&source, &first_label, 1, Some(Duration::from_millis(50)))
        .await
        .unwrap_err();
    assert_eq!(error.state(), Some(QueryState::TimedOut));
    assert_eq!(error.observation().map(|tally| tally.inspected()), Some(0));
}
