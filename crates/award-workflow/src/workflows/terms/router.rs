use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};

use super::domain::{TermDraft, TermId};
use super::repository::TermRepository;
use super::service::{TermService, TermServiceError};
use crate::error::{error_response, rejected};

/// Router builder exposing term administration and lookup endpoints.
pub fn term_router<T>(service: Arc<TermService<T>>) -> Router
where
    T: TermRepository + 'static,
{
    Router::new()
        .route(
            "/api/v1/terms",
            get(list_handler::<T>).post(create_handler::<T>),
        )
        .route("/api/v1/terms/latest", get(latest_handler::<T>))
        .route("/api/v1/terms/current", get(current_handler::<T>))
        .route("/api/v1/terms/registrable", get(registrable_handler::<T>))
        .route(
            "/api/v1/terms/:term_id",
            get(get_handler::<T>)
                .put(update_handler::<T>)
                .delete(delete_handler::<T>),
        )
        .route(
            "/api/v1/terms/:term_id/current",
            post(set_current_handler::<T>),
        )
        .route("/api/v1/terms/:term_id/open", post(open_handler::<T>))
        .with_state(service)
}

impl IntoResponse for TermServiceError {
    fn into_response(self) -> Response {
        error_response(self.kind(), self.to_string())
    }
}

pub(crate) async fn list_handler<T>(State(service): State<Arc<TermService<T>>>) -> Response
where
    T: TermRepository + 'static,
{
    match service.list() {
        Ok(terms) => (StatusCode::OK, Json(terms)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn create_handler<T>(
    State(service): State<Arc<TermService<T>>>,
    draft: Result<Json<TermDraft>, JsonRejection>,
) -> Response
where
    T: TermRepository + 'static,
{
    let draft = match draft {
        Ok(Json(draft)) => draft,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    match service.create(draft) {
        Ok(term) => (StatusCode::CREATED, Json(term)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn latest_handler<T>(State(service): State<Arc<TermService<T>>>) -> Response
where
    T: TermRepository + 'static,
{
    match service.latest() {
        Ok(term) => (StatusCode::OK, Json(term)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn current_handler<T>(State(service): State<Arc<TermService<T>>>) -> Response
where
    T: TermRepository + 'static,
{
    match service.current() {
        Ok(term) => (StatusCode::OK, Json(term)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn registrable_handler<T>(
    State(service): State<Arc<TermService<T>>>,
) -> Response
where
    T: TermRepository + 'static,
{
    match service.registrable() {
        Ok(term) => (StatusCode::OK, Json(term)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn get_handler<T>(
    State(service): State<Arc<TermService<T>>>,
    term_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    T: TermRepository + 'static,
{
    let term_id = match term_id {
        Ok(Path(term_id)) => term_id,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    match service.get(TermId(term_id)) {
        Ok(term) => (StatusCode::OK, Json(term)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn update_handler<T>(
    State(service): State<Arc<TermService<T>>>,
    term_id: Result<Path<i64>, PathRejection>,
    draft: Result<Json<TermDraft>, JsonRejection>,
) -> Response
where
    T: TermRepository + 'static,
{
    let term_id = match term_id {
        Ok(Path(term_id)) => term_id,
        Err(rejection) => return rejected(rejection.body_text()),
    };
    let draft = match draft {
        Ok(Json(draft)) => draft,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    match service.update(TermId(term_id), draft) {
        Ok(term) => (StatusCode::OK, Json(term)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn delete_handler<T>(
    State(service): State<Arc<TermService<T>>>,
    term_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    T: TermRepository + 'static,
{
    let term_id = match term_id {
        Ok(Path(term_id)) => term_id,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    match service.delete(TermId(term_id)) {
        Ok(()) => StatusCode::NO_CONTENT.into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn set_current_handler<T>(
    State(service): State<Arc<TermService<T>>>,
    term_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    T: TermRepository + 'static,
{
    let term_id = match term_id {
        Ok(Path(term_id)) => term_id,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    match service.set_current(TermId(term_id)) {
        Ok(term) => (StatusCode::OK, Json(term)).into_response(),
        Err(err) => err.into_response(),
    }
}

pub(crate) async fn open_handler<T>(
    State(service): State<Arc<TermService<T>>>,
    term_id: Result<Path<i64>, PathRejection>,
) -> Response
where
    T: TermRepository + 'static,
{
    let term_id = match term_id {
        Ok(Path(term_id)) => term_id,
        Err(rejection) => return rejected(rejection.body_text()),
    };

    match service.open_for_registration(TermId(term_id)) {
        Ok(term) => (StatusCode::OK, Json(term)).into_response(),
        Err(err) => err.into_response(),
    }
}
