use crate::cli::ServeArgs;
use crate::infra::{AppState, InMemoryRunRepository};
use crate::routes::with_analytics_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use match_insights::analytics::{RunService, SnapshotImporter};
use match_insights::config::AppConfig;
use match_insights::error::AppError;
use match_insights::telemetry::{self, LogSink};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry, LogSink::Stdout)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let repository = Arc::new(InMemoryRunRepository::default());
    let run_service = Arc::new(RunService::new(repository));

    if let Some(path) = &config.analytics.snapshot_path {
        let snapshot = SnapshotImporter::from_path(path)?;
        let session = run_service.submit(snapshot)?;
        info!(run_id = %session.run_id(), path = %path.display(), "preloaded snapshot run");
    }

    let app = with_analytics_routes(run_service)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "match insights service ready");

    axum::serve(listener, app).await?;
    Ok(())
}
