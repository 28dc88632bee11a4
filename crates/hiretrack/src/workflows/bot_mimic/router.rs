use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    middleware,
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tracing::warn;

use super::processor::ProcessError;
use super::scheduler::AutoProcessScheduler;
use crate::api::{failure, rejection, respond, ApiResponse};
use crate::auth::{authenticate, authorize, AccessTokens, RoleGate};
use crate::workflows::applications::domain::ApplicationId;
use crate::workflows::applications::repository::{ApplicationRepository, JobRepository};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct BatchRequest {
    pub(crate) application_ids: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct AutoProcessRequest {
    pub(crate) interval_minutes: u32,
}

#[derive(Debug, Default, Deserialize)]
pub(crate) struct ActivityQuery {
    #[serde(default)]
    pub(crate) limit: Option<usize>,
}

type SharedScheduler<R, J> = Arc<AutoProcessScheduler<R, J>>;

/// Router exposing the Bot Mimic endpoints; every route requires the bot role.
pub fn bot_mimic_router<R, J>(scheduler: SharedScheduler<R, J>, tokens: AccessTokens) -> Router
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    Router::new()
        .route("/bot-mimic/stats", get(stats_handler::<R, J>))
        .route("/bot-mimic/applications", get(eligible_handler::<R, J>))
        .route(
            "/bot-mimic/process-single/:application_id",
            post(process_single_handler::<R, J>),
        )
        .route(
            "/bot-mimic/process-batch",
            post(process_batch_handler::<R, J>),
        )
        .route("/bot-mimic/auto-process", post(enable_handler::<R, J>))
        .route(
            "/bot-mimic/auto-process/enable",
            post(enable_handler::<R, J>),
        )
        .route(
            "/bot-mimic/auto-process/disable",
            post(disable_handler::<R, J>),
        )
        .route(
            "/bot-mimic/auto-process-status",
            get(auto_process_status_handler::<R, J>),
        )
        .route("/bot-mimic/activity-log", get(activity_log_handler::<R, J>))
        .route_layer(middleware::from_fn_with_state(RoleGate::BOT, authorize))
        .route_layer(middleware::from_fn_with_state(tokens, authenticate))
        .with_state(scheduler)
}

pub(crate) fn process_error_response(error: ProcessError) -> Response {
    let status = match &error {
        ProcessError::NotFound(_) | ProcessError::JobNotFound { .. } => StatusCode::NOT_FOUND,
        ProcessError::NotEligible { .. } => StatusCode::UNPROCESSABLE_ENTITY,
        ProcessError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        ProcessError::Conflict(_) => StatusCode::CONFLICT,
        ProcessError::Storage(_) => {
            warn!(error = %error, "bot mimic storage failure");
            StatusCode::SERVICE_UNAVAILABLE
        }
    };
    failure(status, error.to_string())
}

pub(crate) async fn stats_handler<R, J>(State(scheduler): State<SharedScheduler<R, J>>) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    match scheduler.processor().stats().await {
        Ok(stats) => respond(StatusCode::OK, ApiResponse::ok(stats)),
        Err(err) => process_error_response(err),
    }
}

pub(crate) async fn eligible_handler<R, J>(
    State(scheduler): State<SharedScheduler<R, J>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    match scheduler.processor().eligible_applications().await {
        Ok(records) => respond(StatusCode::OK, ApiResponse::ok(records)),
        Err(err) => process_error_response(err),
    }
}

pub(crate) async fn process_single_handler<R, J>(
    State(scheduler): State<SharedScheduler<R, J>>,
    Path(application_id): Path<String>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    let id = ApplicationId(application_id);
    match scheduler.processor().process_one(&id).await {
        Ok(record) => {
            let message = format!("application advanced to {}", record.status());
            respond(StatusCode::OK, ApiResponse::ok(record).with_message(message))
        }
        Err(err) => process_error_response(err),
    }
}

pub(crate) async fn process_batch_handler<R, J>(
    State(scheduler): State<SharedScheduler<R, J>>,
    payload: Result<Json<BatchRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return rejection(err),
    };

    let ids: Vec<ApplicationId> = request
        .application_ids
        .into_iter()
        .map(ApplicationId)
        .collect();

    match scheduler.processor().process_batch(&ids).await {
        Ok(report) => {
            let message = format!(
                "processed {} applications: {} succeeded, {} failed",
                report.total, report.succeeded, report.failed
            );
            respond(StatusCode::OK, ApiResponse::ok(report).with_message(message))
        }
        Err(err) => process_error_response(err),
    }
}

pub(crate) async fn enable_handler<R, J>(
    State(scheduler): State<SharedScheduler<R, J>>,
    payload: Result<Json<AutoProcessRequest>, JsonRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    let Json(request) = match payload {
        Ok(payload) => payload,
        Err(err) => return rejection(err),
    };

    match scheduler.enable(request.interval_minutes) {
        Ok(status) => respond(
            StatusCode::OK,
            ApiResponse::ok(status).with_message("auto-process enabled"),
        ),
        Err(err) => failure(StatusCode::BAD_REQUEST, err.to_string()),
    }
}

pub(crate) async fn disable_handler<R, J>(
    State(scheduler): State<SharedScheduler<R, J>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    let status = scheduler.disable();
    respond(
        StatusCode::OK,
        ApiResponse::ok(status).with_message("auto-process disabled"),
    )
}

pub(crate) async fn auto_process_status_handler<R, J>(
    State(scheduler): State<SharedScheduler<R, J>>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    respond(StatusCode::OK, ApiResponse::ok(scheduler.status()))
}

pub(crate) async fn activity_log_handler<R, J>(
    State(scheduler): State<SharedScheduler<R, J>>,
    query: Result<Query<ActivityQuery>, QueryRejection>,
) -> Response
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    let Query(query) = match query {
        Ok(query) => query,
        Err(err) => {
            return failure(
                StatusCode::BAD_REQUEST,
                format!("invalid query: {}", err.body_text()),
            )
        }
    };

    match scheduler.processor().activity_log(query.limit).await {
        Ok(entries) => respond(StatusCode::OK, ApiResponse::ok(entries)),
        Err(err) => process_error_response(err),
    }
}
