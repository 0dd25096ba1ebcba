use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        DefaultBodyLimit, Multipart, Path, Query, State,
    },
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tracing::error;

use super::attachments::AttachmentUpload;
use super::domain::{ActorId, AuditEntry, AwardClassification, FormStatus, SubmissionId};
use super::input::{InputViolation, SubmissionInput};
use super::repository::{AuditLogRepository, ChangeOutcome, SubmissionRepository};
use super::search::{ActorRequest, SearchRequest};
use super::service::{AuditAnnotation, SubmissionService, SubmissionServiceError};
use crate::error::{error_response, rejected, ErrorKind};

pub const ACTOR_HEADER: &str = "x-actor-id";
pub const CAMPUS_HEADER: &str = "x-campus-id";

/// Headroom for the JSON payload part and multipart framing on top of the attachment cap.
const MULTIPART_OVERHEAD_BYTES: usize = 1024 * 1024;

/// Router builder exposing nomination intake, review, search, and audit endpoints.
pub fn submission_router<R>(service: Arc<SubmissionService<R>>) -> Router
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    let body_limit = usize::try_from(service.policy().max_total_bytes)
        .unwrap_or(usize::MAX)
        .saturating_add(MULTIPART_OVERHEAD_BYTES);

    Router::new()
        .route(
            "/api/v1/awards",
            post(submit_handler::<R>).get(search_handler::<R>),
        )
        .route("/api/v1/awards/mine", get(mine_handler::<R>))
        .route("/api/v1/awards/mine/current", get(mine_current_handler::<R>))
        .route(
            "/api/v1/awards/classifications",
            get(classifications_handler::<R>),
        )
        .route("/api/v1/awards/:form_id", get(get_handler::<R>))
        .route(
            "/api/v1/awards/:form_id/classification",
            put(reclassify_handler::<R>),
        )
        .route("/api/v1/awards/:form_id/status", put(status_handler::<R>))
        .route(
            "/api/v1/awards/:form_id/audit",
            get(audit_trail_handler::<R>).post(annotate_handler::<R>),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(service)
}

impl IntoResponse for SubmissionServiceError {
    fn into_response(self) -> Response {
        let kind = self.kind();
        if matches!(kind, ErrorKind::StorageFailure | ErrorKind::PersistenceFailure) {
            error!(error = %self, kind = kind.label(), "award workflow failure");
        }
        error_response(kind, self.to_string())
    }
}

fn actor_from(headers: &HeaderMap) -> Result<ActorId, Response> {
    headers
        .get(ACTOR_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(ActorId::new)
        .ok_or_else(|| {
            error_response(
                ErrorKind::Unauthenticated,
                format!("missing {ACTOR_HEADER} header"),
            )
        })
}

fn campus_from(headers: &HeaderMap) -> Result<i64, Response> {
    headers
        .get(CAMPUS_HEADER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<i64>().ok())
        .ok_or_else(|| {
            error_response(
                ErrorKind::Unauthenticated,
                format!("missing or invalid {CAMPUS_HEADER} header"),
            )
        })
}

fn malformed(message: impl Into<String>) -> Response {
    SubmissionServiceError::from(InputViolation::Malformed(message.into())).into_response()
}

/// Outcome of a guarded mutation as returned to API callers.
#[derive(Debug, Serialize)]
pub struct ChangeView {
    pub form_id: SubmissionId,
    pub changed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entry: Option<AuditEntry>,
}

impl ChangeView {
    fn from_outcome(form_id: SubmissionId, outcome: ChangeOutcome) -> Self {
        match outcome {
            ChangeOutcome::Unchanged => Self {
                form_id,
                changed: false,
                entry: None,
            },
            ChangeOutcome::Recorded(entry) => Self {
                form_id,
                changed: true,
                entry: Some(entry),
            },
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ClassificationChange {
    pub classification: String,
}

#[derive(Debug, Deserialize)]
pub struct StatusChange {
    pub status: String,
    #[serde(default)]
    pub reject_reason: Option<String>,
}

async fn read_submission(
    mut multipart: Multipart,
) -> Result<(SubmissionInput, Vec<AttachmentUpload>), Response> {
    let mut payload = None;
    let mut uploads = Vec::new();

    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => return Err(malformed(err.body_text())),
        };

        match field.name() {
            Some("payload") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|err| malformed(err.body_text()))?;
                let input: SubmissionInput = serde_json::from_str(&raw)
                    .map_err(|err| malformed(format!("payload: {err}")))?;
                payload = Some(input);
            }
            Some("files") => {
                let file_name = field.file_name().unwrap_or_default().to_string();
                let content = field
                    .bytes()
                    .await
                    .map_err(|err| malformed(err.body_text()))?;
                uploads.push(AttachmentUpload::new(file_name, content.to_vec()));
            }
            _ => {}
        }
    }

    let input = payload.ok_or_else(|| {
        SubmissionServiceError::from(InputViolation::MissingField { field: "payload" })
            .into_response()
    })?;
    Ok((input, uploads))
}

pub(crate) async fn submit_handler<R>(
    State(service): State<Arc<SubmissionService<R>>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let (input, uploads) = match read_submission(multipart).await {
        Ok(parts) => parts,
        Err(response) => return response,
    };

    let outcome =
        tokio::task::spawn_blocking(move || service.submit(&actor, input, uploads)).await;

    match outcome {
        Ok(Ok(record)) => (StatusCode::CREATED, Json(record)).into_response(),
        Ok(Err(err)) => err.into_response(),
        Err(join) => {
            error!(error = %join, "submission task aborted");
            error_response(ErrorKind::Internal, "submission task aborted")
        }
    }
}

pub(crate) async fn search_handler<R>(
    State(service): State<Arc<SubmissionService<R>>>,
    headers: HeaderMap,
    request: Result<Query<SearchRequest>, QueryRejection>,
) -> Response
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    let request = match request {
        Ok(Query(request)) => request,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    let campus_id = match campus_from(&headers) {
        Ok(campus_id) => campus_id,
        Err(response) => return response,
    };

    match service.search(&request.into_query(campus_id)) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn mine_handler<R>(
    State(service): State<Arc<SubmissionService<R>>>,
    headers: HeaderMap,
    request: Result<Query<ActorRequest>, QueryRejection>,
) -> Response
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    let request = match request {
        Ok(Query(request)) => request,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let query = match request.into_query(actor) {
        Ok(query) => query,
        Err(message) => return malformed(message),
    };

    match service.for_actor(&query) {
        Ok(page) => (StatusCode::OK, Json(page)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn mine_current_handler<R>(
    State(service): State<Arc<SubmissionService<R>>>,
    headers: HeaderMap,
) -> Response
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.for_actor_current_term(&actor) {
        Ok(records) => (StatusCode::OK, Json(records)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn classifications_handler<R>(
    State(service): State<Arc<SubmissionService<R>>>,
) -> Response
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    (StatusCode::OK, Json(service.classifications())).into_response()
}

pub(crate) async fn get_handler<R>(
    State(service): State<Arc<SubmissionService<R>>>,
    form_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    let form_id = match form_id {
        Ok(Path(form_id)) => form_id,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    match service.get(SubmissionId(form_id)) {
        Ok(record) => (StatusCode::OK, Json(record)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn reclassify_handler<R>(
    State(service): State<Arc<SubmissionService<R>>>,
    headers: HeaderMap,
    form_id: Result<Path<i64>, PathRejection>,
    change: Result<Json<ClassificationChange>, JsonRejection>,
) -> Response
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    let form_id = match form_id {
        Ok(Path(form_id)) => form_id,
        Err(rejection) => return rejected(rejection.body_text()),
    };
    let change = match change {
        Ok(Json(change)) => change,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let classification = match change.classification.parse::<AwardClassification>() {
        Ok(classification) => classification,
        Err(raw) => {
            return SubmissionServiceError::from(InputViolation::UnknownClassification(raw))
                .into_response()
        }
    };

    let form_id = SubmissionId(form_id);
    match service.reclassify(form_id, classification, &actor) {
        Ok(outcome) => (StatusCode::OK, Json(ChangeView::from_outcome(form_id, outcome)))
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn status_handler<R>(
    State(service): State<Arc<SubmissionService<R>>>,
    headers: HeaderMap,
    form_id: Result<Path<i64>, PathRejection>,
    change: Result<Json<StatusChange>, JsonRejection>,
) -> Response
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    let form_id = match form_id {
        Ok(Path(form_id)) => form_id,
        Err(rejection) => return rejected(rejection.body_text()),
    };
    let change = match change {
        Ok(Json(change)) => change,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };
    let status = match change.status.parse::<FormStatus>() {
        Ok(status) => status,
        Err(raw) => {
            return SubmissionServiceError::from(InputViolation::UnknownStatus(raw))
                .into_response()
        }
    };

    let form_id = SubmissionId(form_id);
    match service.change_status(form_id, status, change.reject_reason, &actor) {
        Ok(outcome) => (StatusCode::OK, Json(ChangeView::from_outcome(form_id, outcome)))
            .into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn audit_trail_handler<R>(
    State(service): State<Arc<SubmissionService<R>>>,
    form_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    let form_id = match form_id {
        Ok(Path(form_id)) => form_id,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    match service.audit_trail(SubmissionId(form_id)) {
        Ok(entries) => (StatusCode::OK, Json(entries)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn annotate_handler<R>(
    State(service): State<Arc<SubmissionService<R>>>,
    headers: HeaderMap,
    form_id: Result<Path<i64>, PathRejection>,
    annotation: Result<Json<AuditAnnotation>, JsonRejection>,
) -> Response
where
    R: SubmissionRepository + AuditLogRepository + 'static,
{
    let form_id = match form_id {
        Ok(Path(form_id)) => form_id,
        Err(rejection) => return rejected(rejection.body_text()),
    };
    let annotation = match annotation {
        Ok(Json(annotation)) => annotation,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    let actor = match actor_from(&headers) {
        Ok(actor) => actor,
        Err(response) => return response,
    };

    match service.annotate(SubmissionId(form_id), annotation, &actor) {
        Ok(entry) => (StatusCode::CREATED, Json(entry)).into_response(),
        Err(err) => err.into_response(),
    }
}
