mod common;

use axum::body::Body;
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use common::{district_snapshot, sid, MemoryRunRepository};
use match_insights::analytics::{analytics_router, ResultSnapshot, RunService};
use serde_json::Value;
use std::sync::Arc;
use tower::ServiceExt;

fn service() -> Arc<RunService<MemoryRunRepository>> {
    Arc::new(RunService::new(Arc::new(MemoryRunRepository::default())))
}

fn submit_request(snapshot: &ResultSnapshot) -> Request<Body> {
    Request::post("/api/v1/runs")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(
            serde_json::to_vec(snapshot).expect("serialize snapshot"),
        ))
        .expect("request")
}

fn get_request(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request")
}

async fn json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

#[tokio::test]
async fn current_run_is_not_found_before_submission() {
    let response = analytics_router(service())
        .oneshot(get_request("/api/v1/runs/current"))
        .await
        .expect("response");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("no run"));
}

#[tokio::test]
async fn submitted_run_becomes_current() {
    let service = service();

    let response = analytics_router(service.clone())
        .oneshot(submit_request(&district_snapshot()))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::CREATED);
    let created = json_body(response).await;
    assert_eq!(created["run_id"], "run-000001");
    assert_eq!(created["summary"]["total_students"], 6);

    let response = analytics_router(service)
        .oneshot(get_request("/api/v1/runs/current"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let current = json_body(response).await;
    assert_eq!(current["run_id"], "run-000001");
    assert!(current["insights"]["headlines"]
        .as_array()
        .expect("headlines")
        .iter()
        .any(|line| line.as_str().is_some_and(|text| text.contains("top choice"))));
}

#[tokio::test]
async fn student_drill_down_reports_comparisons() {
    let service = service();
    service.submit(district_snapshot()).expect("run published");

    let response = analytics_router(service.clone())
        .oneshot(get_request("/api/v1/runs/current/students/s6"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::OK);
    let body = json_body(response).await;
    assert_eq!(body["outcome"]["student_id"], "s6");
    assert_eq!(body["outcome"]["same_school"]["status"], "not_applicable");
    assert_eq!(body["outcome"]["ahead"]["students_ahead"], 5);
    assert!(!body["narrative"].as_array().expect("narrative").is_empty());

    let response = analytics_router(service)
        .oneshot(get_request("/api/v1/runs/current/students/ghost"))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn inconsistent_snapshot_is_unprocessable() {
    let service = service();
    let mut snapshot = district_snapshot();
    snapshot.matches.remove(&sid("s2"));

    let response = analytics_router(service.clone())
        .oneshot(submit_request(&snapshot))
        .await
        .expect("response");
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = json_body(response).await;
    assert!(body["error"]
        .as_str()
        .expect("error message")
        .contains("match entries"));

    assert!(service.current().is_err());
}
