use crate::cli::ServeArgs;
use crate::infra::{build_manager, AppState};
use crate::routes::with_simulation_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use scenario_engine::config::AppConfig;
use scenario_engine::error::AppError;
use scenario_engine::telemetry;
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
    if let Some(path) = args.scenario_file.take() {
        config.simulation.scenario_file = Some(path);
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let manager = build_manager(&config.simulation)?;
    let scenario_count = manager.catalog().len();

    let app = with_simulation_routes(manager)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, scenario_count, "scenario simulation engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
