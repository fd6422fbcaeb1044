use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::json;

use super::clock::Clock;
use super::domain::{ApplicationId, StudentId, TaskId, TaskStatus};
use super::extraction::ParsedOfferRecord;
use super::service::OfferLedger;
use super::store::{KeyValueStore, StoreError};

/// Router builder exposing reconciliation, task updates and the read views.
pub fn offer_router<K, C>(ledger: Arc<OfferLedger<K, C>>) -> Router
where
    K: KeyValueStore + 'static,
    C: Clock + 'static,
{
    Router::new()
        .route("/api/v1/offers", post(reconcile_handler::<K, C>))
        .route("/api/v1/students", get(students_handler::<K, C>))
        .route(
            "/api/v1/students/:student_id/applications",
            get(student_applications_handler::<K, C>),
        )
        .route("/api/v1/applications", get(applications_handler::<K, C>))
        .route(
            "/api/v1/applications/:application_id/tasks",
            get(application_tasks_handler::<K, C>),
        )
        .route("/api/v1/tasks", get(tasks_handler::<K, C>))
        .route(
            "/api/v1/tasks/:task_id/status",
            put(task_status_handler::<K, C>),
        )
        .with_state(ledger)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskStatusRequest {
    pub status: TaskStatus,
}

fn store_failure(error: StoreError) -> Response {
    tracing::error!(%error, "offer ledger store failure");
    let payload = json!({
        "error": error.to_string(),
    });
    (StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response()
}

/// Runs a ledger call on the blocking pool; store access is synchronous file io.
async fn with_ledger<K, C, T, F>(ledger: Arc<OfferLedger<K, C>>, work: F) -> Result<T, Response>
where
    K: KeyValueStore + 'static,
    C: Clock + 'static,
    T: Send + 'static,
    F: FnOnce(&OfferLedger<K, C>) -> Result<T, StoreError> + Send + 'static,
{
    match tokio::task::spawn_blocking(move || work(ledger.as_ref())).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(error)) => Err(store_failure(error)),
        Err(error) => {
            tracing::error!(%error, "offer ledger task did not complete");
            let payload = json!({ "error": "offer ledger task did not complete" });
            Err((StatusCode::INTERNAL_SERVER_ERROR, Json(payload)).into_response())
        }
    }
}

async fn listing<K, C, T, F>(ledger: Arc<OfferLedger<K, C>>, work: F) -> Response
where
    K: KeyValueStore + 'static,
    C: Clock + 'static,
    T: Serialize + Send + 'static,
    F: FnOnce(&OfferLedger<K, C>) -> Result<T, StoreError> + Send + 'static,
{
    match with_ledger(ledger, work).await {
        Ok(items) => (StatusCode::OK, Json(items)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn reconcile_handler<K, C>(
    State(ledger): State<Arc<OfferLedger<K, C>>>,
    Json(parsed): Json<ParsedOfferRecord>,
) -> Response
where
    K: KeyValueStore + 'static,
    C: Clock + 'static,
{
    match with_ledger(ledger, move |ledger| ledger.reconcile(&parsed)).await {
        Ok(outcome) if outcome.success => (StatusCode::OK, Json(outcome)).into_response(),
        Ok(outcome) => (StatusCode::UNPROCESSABLE_ENTITY, Json(outcome)).into_response(),
        Err(response) => response,
    }
}

pub(crate) async fn students_handler<K, C>(
    State(ledger): State<Arc<OfferLedger<K, C>>>,
) -> Response
where
    K: KeyValueStore + 'static,
    C: Clock + 'static,
{
    listing(ledger, |ledger| ledger.students()).await
}

pub(crate) async fn student_applications_handler<K, C>(
    State(ledger): State<Arc<OfferLedger<K, C>>>,
    Path(student_id): Path<String>,
) -> Response
where
    K: KeyValueStore + 'static,
    C: Clock + 'static,
{
    let student_id = StudentId(student_id);
    listing(ledger, move |ledger| {
        ledger.applications_for_student(&student_id)
    })
    .await
}

pub(crate) async fn applications_handler<K, C>(
    State(ledger): State<Arc<OfferLedger<K, C>>>,
) -> Response
where
    K: KeyValueStore + 'static,
    C: Clock + 'static,
{
    listing(ledger, |ledger| ledger.applications()).await
}

pub(crate) async fn application_tasks_handler<K, C>(
    State(ledger): State<Arc<OfferLedger<K, C>>>,
    Path(application_id): Path<String>,
) -> Response
where
    K: KeyValueStore + 'static,
    C: Clock + 'static,
{
    let application_id = ApplicationId(application_id);
    listing(ledger, move |ledger| {
        ledger.tasks_for_application(&application_id)
    })
    .await
}

pub(crate) async fn tasks_handler<K, C>(State(ledger): State<Arc<OfferLedger<K, C>>>) -> Response
where
    K: KeyValueStore + 'static,
    C: Clock + 'static,
{
    listing(ledger, |ledger| ledger.tasks()).await
}

pub(crate) async fn task_status_handler<K, C>(
    State(ledger): State<Arc<OfferLedger<K, C>>>,
    Path(task_id): Path<String>,
    Json(request): Json<TaskStatusRequest>,
) -> Response
where
    K: KeyValueStore + 'static,
    C: Clock + 'static,
{
    let task_id = TaskId(task_id);
    let status = request.status;
    let target = task_id.clone();
    match with_ledger(ledger, move |ledger| {
        ledger.update_task_status(&target, status)
    })
    .await
    {
        Ok(updated) => {
            let payload = json!({
                "task_id": task_id.0,
                "status": status.label(),
                "updated": updated,
            });
            (StatusCode::OK, Json(payload)).into_response()
        }
        Err(response) => response,
    }
}
