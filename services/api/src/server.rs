use crate::cli::ServeArgs;
use crate::infra::{access_tokens, AppState, MemoryScheduler, Services};
use crate::routes::build_router;
use axum::{Extension, Router};
use axum_prometheus::PrometheusMetricLayer;
use hiretrack::config::AppConfig;
use hiretrack::error::AppError;
use hiretrack::telemetry;
use std::sync::atomic::{AtomicBool, Ordering};
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{info, warn};

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let tokens = access_tokens(&config.auth);
    if tokens.is_empty() {
        warn!("no bearer tokens configured; every API route will answer 401");
    }

    let services = Services::in_memory(&config.bot_mimic);
    if config.bot_mimic.auto_process_on_start {
        services
            .scheduler
            .enable(config.bot_mimic.default_interval_minutes)?;
    }

    let app = build_router(services.registry, services.scheduler.clone(), tokens)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        auto_process = config.bot_mimic.auto_process_on_start,
        "application tracker ready"
    );

    serve_until(listener, app, &services.scheduler, shutdown_signal()).await
}

/// Serve until `shutdown` resolves, then stop the auto-process trigger.
async fn serve_until<F>(
    listener: TcpListener,
    app: Router,
    scheduler: &MemoryScheduler,
    shutdown: F,
) -> Result<(), AppError>
where
    F: Future<Output = ()> + Send + 'static,
{
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    let status = scheduler.disable();
    info!(
        last_run = ?status.last_run_time,
        "application tracker stopped"
    );
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        warn!(error = %err, "failed to listen for ctrl-c; serving until the process is killed");
        std::future::pending::<()>().await;
    }
    info!("received ctrl-c, shutting down");
}
