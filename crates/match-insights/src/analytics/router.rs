use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::domain::{ResultSnapshot, StudentId};
use super::runs::{RunRepository, RunService};
use crate::error::AppError;

/// Router builder exposing run submission and drill-down endpoints.
pub fn analytics_router<R>(service: Arc<RunService<R>>) -> Router
where
    R: RunRepository + 'static,
{
    Router::new()
        .route("/api/v1/runs", post(submit_handler::<R>))
        .route("/api/v1/runs/current", get(current_handler::<R>))
        .route(
            "/api/v1/runs/current/students/:student_id",
            get(student_handler::<R>),
        )
        .with_state(service)
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<RunService<R>>>,
    Json(snapshot): Json<ResultSnapshot>,
) -> Response
where
    R: RunRepository + 'static,
{
    match service.submit(snapshot) {
        Ok(session) => (StatusCode::CREATED, Json(session.view())).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn current_handler<R>(State(service): State<Arc<RunService<R>>>) -> Response
where
    R: RunRepository + 'static,
{
    match service.current() {
        Ok(session) => (StatusCode::OK, Json(session.view())).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}

pub(crate) async fn student_handler<R>(
    State(service): State<Arc<RunService<R>>>,
    Path(student_id): Path<String>,
) -> Response
where
    R: RunRepository + 'static,
{
    match service.student_outcome(&StudentId(student_id)) {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => AppError::from(error).into_response(),
    }
}
