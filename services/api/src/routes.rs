use crate::infra::AppState;
use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::{Extension, Json, Router};
use hiretrack::auth::AccessTokens;
use hiretrack::workflows::applications::{
    application_router, ApplicationRegistry, ApplicationRepository, JobRepository,
};
use hiretrack::workflows::bot_mimic::{bot_mimic_router, AutoProcessScheduler};
use serde_json::json;
use std::sync::atomic::Ordering;
use std::sync::Arc;

/// Application and Bot Mimic routes behind bearer auth, plus unauthenticated ops endpoints.
pub(crate) fn build_router<R, J>(
    registry: Arc<ApplicationRegistry<R, J>>,
    scheduler: Arc<AutoProcessScheduler<R, J>>,
    tokens: AccessTokens,
) -> Router
where
    R: ApplicationRepository + 'static,
    J: JobRepository + 'static,
{
    application_router(registry, tokens.clone())
        .merge(bot_mimic_router(scheduler, tokens))
        .route("/health", get(healthcheck))
        .route("/ready", get(readiness_endpoint))
        .route("/metrics", get(metrics_endpoint))
}

pub(crate) async fn healthcheck() -> Json<serde_json::Value> {
    Json(json!({ "status": "ok" }))
}

pub(crate) async fn readiness_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    let ready = state.readiness.load(Ordering::Acquire);
    let (status, label) = if ready {
        (StatusCode::OK, "ready")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "initializing")
    };

    (status, Json(json!({ "status": label })))
}

pub(crate) async fn metrics_endpoint(Extension(state): Extension<AppState>) -> impl IntoResponse {
    (
        StatusCode::OK,
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        state.metrics.render(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infra::Services;
    use axum::body::Body;
    use axum::http::Request;
    use hiretrack::config::BotMimicConfig;
    use hiretrack::workflows::applications::Actor;
    use metrics_exporter_prometheus::PrometheusBuilder;
    use std::sync::atomic::AtomicBool;
    use std::time::Duration;
    use tower::ServiceExt;

    fn app(ready: bool) -> Router {
        let services = Services::in_memory(&BotMimicConfig {
            persistence_timeout: Duration::from_secs(1),
            default_interval_minutes: 5,
            auto_process_on_start: false,
        });
        let state = AppState {
            readiness: Arc::new(AtomicBool::new(ready)),
            metrics: Arc::new(PrometheusBuilder::new().build_recorder().handle()),
        };
        let tokens = AccessTokens::new().with_token("bot-token", Actor::bot_mimic());

        build_router(services.registry, services.scheduler, tokens).layer(Extension(state))
    }

    fn get_request(uri: &str) -> Request<Body> {
        Request::get(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn health_is_public() {
        let response = app(true)
            .oneshot(get_request("/health"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn readiness_reflects_flag() {
        let response = app(false)
            .oneshot(get_request("/ready"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);

        let response = app(true)
            .oneshot(get_request("/ready"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn metrics_render_as_prometheus_text() {
        let response = app(true)
            .oneshot(get_request("/metrics"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::CONTENT_TYPE).unwrap(),
            "text/plain; version=0.0.4"
        );
    }

    #[tokio::test]
    async fn merged_api_routes_stay_authenticated() {
        let response = app(true)
            .oneshot(get_request("/bot-mimic/stats"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(true)
            .oneshot(get_request("/jobs"))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let response = app(true)
            .oneshot(
                Request::get("/bot-mimic/auto-process-status")
                    .header(header::AUTHORIZATION, "Bearer bot-token")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
    }
}
