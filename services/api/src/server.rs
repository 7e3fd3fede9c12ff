use crate::cli::ServeArgs;
use crate::infra::{seed_demo_data, AppState, InMemoryPlacementStore, LoggingNotificationDispatcher};
use crate::routes::with_placement_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use placement_core::config::AppConfig;
use placement_core::error::AppError;
use placement_core::placements::PlacementEngine;
use placement_core::telemetry;
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

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(InMemoryPlacementStore::default());
    if config.seed_demo_data {
        seed_demo_data(&store)?;
        info!("seeded demo drives and students");
    }
    let dispatcher = Arc::new(LoggingNotificationDispatcher::default());
    let engine = Arc::new(PlacementEngine::new(store, dispatcher));

    let app = with_placement_routes(engine)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(?config.environment, %addr, "placement drive engine ready");

    axum::serve(listener, app).await?;
    Ok(())
}
