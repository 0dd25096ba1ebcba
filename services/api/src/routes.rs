use crate::infra::AppState;
use award_workflow::workflows::awards::{
    submission_router, AuditLogRepository, SubmissionRepository, SubmissionService,
};
use award_workflow::workflows::terms::{term_router, TermRepository, TermService};
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::Extension;
use axum::Json;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

pub(crate) fn with_workflow_routes<T, R>(
    terms: Arc<TermService<T>>,
    submissions: Arc<SubmissionService<R>>,
) -> axum::Router
where
    T: TermRepository + 'static,
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    term_router(terms)
        .merge(submission_router(submissions))
        .route("/health", axum::routing::get(healthcheck))
        .route("/ready", axum::routing::get(readiness_endpoint))
        .route("/metrics", axum::routing::get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

/// Ready once the listener is bound and the database answers.
pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let started = state.readiness.load(std::sync::atomic::Ordering::Relaxed);
    let database = state
        .store
        .ping()
        .inspect_err(|err| warn!(error = %err, "database ping failed"))
        .is_ok();

    let (status, payload) = match (started, database) {
        (true, true) => (StatusCode::OK, json!({ "status": "ready" })),
        (false, _) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "initializing" }),
        ),
        (true, false) => (
            StatusCode::SERVICE_UNAVAILABLE,
            json!({ "status": "degraded", "database": "unavailable" }),
        ),
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
