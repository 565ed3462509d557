use crate::infra::AppState;
use crate::report::{assemble, ReportDocument};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use match_insights::analytics::{
    analytics_router, ResultSnapshot, RunRepository, RunService, SnapshotImporter,
};
use match_insights::error::AppError;
use serde::Deserialize;
use serde_json::json;
use std::io::Cursor;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub(crate) struct ReportRequest {
    pub(crate) snapshot: ResultSnapshot,
    #[serde(default)]
    pub(crate) students_csv: Option<String>,
    #[serde(default)]
    pub(crate) schools_csv: Option<String>,
    #[serde(default)]
    pub(crate) student_id: Option<String>,
}

pub(crate) fn with_analytics_routes<R>(service: Arc<RunService<R>>) -> axum::Router
where
    R: RunRepository + 'static,
{
    analytics_router(service)
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
        .route("/api/v1/report", axum::routing::post(report_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let status = if ready {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    let payload = if ready {
        json!({ "status": "ready" })
    } else {
        json!({ "status": "initializing" })
    };

    (status, Json(payload))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

/// Stateless variant of a run: nothing is published.
pub(crate) async fn report_endpoint(
    Json(payload): Json<ReportRequest>,
) -> Result<Json<ReportDocument>, AppError> {
    let ReportRequest {
        mut snapshot,
        students_csv,
        schools_csv,
        student_id,
    } = payload;

    if let Some(csv) = students_csv {
        snapshot = SnapshotImporter::with_student_table(snapshot, Cursor::new(csv.into_bytes()))?;
    }
    if let Some(csv) = schools_csv {
        snapshot = SnapshotImporter::with_school_table(snapshot, Cursor::new(csv.into_bytes()))?;
    }

    Ok(Json(assemble(snapshot, student_id.as_deref())?))
}
