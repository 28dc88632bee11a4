use std::sync::Arc;

use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post},
    Extension, Json, Router,
};
use tracing::warn;

use super::domain::{Actor, ApplicationId, ApplicationSubmission, JobDraft, StatusChangeRequest};
use super::repository::{ApplicationRepository, JobRepository, RepositoryError};
use super::service::{ApplicationRegistry, RegistryError};
use crate::api::{failure, rejection, respond, ApiResponse};
use crate::auth::{authenticate, AccessTokens};

/// Router exposing job postings, submissions, and manual status changes.
pub fn application_router<R, J>(
    registry: Arc<ApplicationRegistry<R, J>>,
    tokens: AccessTokens,
) -> Router
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    Router::new()
        .route(
            "/jobs",
            post(create_job_handler::<R, J>).get(list_jobs_handler::<R, J>),
        )
        .route("/applications", post(submit_handler::<R, J>))
        .route(
            "/applications/:application_id",
            get(application_handler::<R, J>),
        )
        .route(
            "/applications/:application_id/status",
            post(status_change_handler::<R, J>),
        )
        .route_layer(middleware::from_fn_with_state(tokens, authenticate))
        .with_state(registry)
}

pub(crate) fn registry_error_response(error: RegistryError) -> Response {
    let status = match &error {
        RegistryError::Forbidden { .. } => StatusCode::FORBIDDEN,
        RegistryError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        RegistryError::JobNotFound(_) | RegistryError::NotFound(_) => StatusCode::NOT_FOUND,
        RegistryError::InvalidTransition { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        RegistryError::Conflict(_) | RegistryError::Repository(RepositoryError::Conflict) => {
            StatusCode::CONFLICT
        }
        RegistryError::Repository(_) => {
            warn!(error = %error, "application registry storage failure");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    failure(status, error.to_string())
}

pub(crate) async fn create_job_handler<R, J>(
    State(registry): State<Arc<ApplicationRegistry<R, J>>>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<JobDraft>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    let Json(draft) = match payload {
        Ok(payload) => payload,
        Err(err) => return rejection(err),
    };

    match registry.create_job(&actor, draft).await {
        Ok(job) => respond(StatusCode::CREATED, ApiResponse::ok(job)),
        Err(err) => registry_error_response(err),
    }
}

pub(crate) async fn list_jobs_handler<R, J>(
    State(registry): State<Arc<ApplicationRegistry<R, J>>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    match registry.list_jobs().await {
        Ok(jobs) => respond(StatusCode::OK, ApiResponse::ok(jobs)),
        Err(err) => registry_error_response(err),
    }
}

pub(crate) async fn submit_handler<R, J>(
    State(registry): State<Arc<ApplicationRegistry<R, J>>>,
    Extension(actor): Extension<Actor>,
    payload: Result<Json<ApplicationSubmission>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    let Json(submission) = match payload {
        Ok(payload) => payload,
        Err(err) => return rejection(err),
    };

    match registry.submit(&actor, submission).await {
        Ok(record) => respond(StatusCode::CREATED, ApiResponse::ok(record)),
        Err(err) => registry_error_response(err),
    }
}

pub(crate) async fn application_handler<R, J>(
    State(registry): State<Arc<ApplicationRegistry<R, J>>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    match registry.get(&ApplicationId(application_id)).await {
        Ok(record) => respond(StatusCode::OK, ApiResponse::ok(record)),
        Err(err) => registry_error_response(err),
    }
}

pub(crate) async fn status_change_handler<R, J>(
    State(registry): State<Arc<ApplicationRegistry<R, J>>>,
    Extension(actor): Extension<Actor>,
    Path(application_id): Path<String>,
    payload: Result<Json<StatusChangeRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return rejection(err),
    };

    let id = ApplicationId(application_id);
    match registry.change_status(&actor, &id, request).await {
        Ok(record) => respond(StatusCode::OK, ApiResponse::ok(record)),
        Err(err) => registry_error_response(err),
    }
}
