use crate::cli::ServeArgs;
use crate::infra::AppState;
use crate::routes::with_service_routes;
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use offerflow::config::AppConfig;
use offerflow::error::AppError;
use offerflow::telemetry;
use offerflow::workflows::offers::{FileKeyValueStore, OfferLedger};
use std::path::PathBuf;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use tracing::info;

pub(crate) async fn run(mut args: ServeArgs, data_dir: Option<PathBuf>) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }
    if let Some(data_dir) = data_dir {
        config.storage.data_dir = data_dir;
    }

    telemetry::init(&config.telemetry, config.environment)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(FileKeyValueStore::open(&config.storage.data_dir)?);
    let ledger = Arc::new(OfferLedger::new(store));

    let app = with_service_routes(ledger)
        .layer(Extension(app_state))
        .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        data_dir = %config.storage.data_dir.display(),
        "offer reconciliation service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}
