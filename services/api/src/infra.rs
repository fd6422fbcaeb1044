use metrics_exporter_prometheus::PrometheusHandle;
use offerflow::config::AppConfig;
use offerflow::error::AppError;
use offerflow::workflows::offers::{FileKeyValueStore, OfferLedger, TaskStatus};
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Configured data directory, with the command line taking precedence.
pub(crate) fn resolve_data_dir(data_dir: Option<PathBuf>) -> Result<PathBuf, AppError> {
    match data_dir {
        Some(dir) => Ok(dir),
        None => Ok(AppConfig::load()?.storage.data_dir),
    }
}

pub(crate) fn open_ledger(
    data_dir: Option<PathBuf>,
) -> Result<OfferLedger<FileKeyValueStore>, AppError> {
    let data_dir = resolve_data_dir(data_dir)?;
    let store = FileKeyValueStore::open(data_dir)?;
    Ok(OfferLedger::new(Arc::new(store)))
}

pub(crate) fn parse_task_status(raw: &str) -> Result<TaskStatus, String> {
    TaskStatus::parse(raw).ok_or_else(|| format!("unknown task status '{raw}' (pending|done)"))
}
