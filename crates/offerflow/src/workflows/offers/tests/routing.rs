use super::common::*;
use axum::extract::State;
use axum::http::StatusCode;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::offers::clock::FixedClock;
use crate::workflows::offers::domain::TaskStatus;
use crate::workflows::offers::router::offer_router;
use crate::workflows::offers::service::OfferLedger;
use crate::workflows::offers::store::MemoryKeyValueStore;

fn json_request(method: &str, uri: &str, body: &Value) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header(axum::http::header::CONTENT_TYPE, "application/json")
        .body(axum::body::Body::from(
            serde_json::to_vec(body).expect("encode body"),
        ))
        .expect("request builds")
}

fn get_request(uri: &str) -> axum::http::Request<axum::body::Body> {
    axum::http::Request::get(uri)
        .body(axum::body::Body::empty())
        .expect("request builds")
}

#[tokio::test]
async fn offers_route_reconciles_camel_case_payloads() {
    let (ledger, _) = build_ledger();
    let router = offer_router(Arc::new(ledger));

    let payload = json!({
        "studentName": "Alice Tan",
        "university": "University of Edinburgh",
        "program": "MSc Data Science",
        "offerType": "Conditional",
        "conditions": ["IELTS 7.0"],
        "depositAmount": 2000,
        "depositDeadline": "2025-06-01"
    });
    let response = router
        .oneshot(json_request("POST", "/api/v1/offers", &payload))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body.get("success"), Some(&json!(true)));
    assert_eq!(body.get("kind"), Some(&json!("new_student")));
    assert_eq!(body.get("tasks_created"), Some(&json!(2)));
    assert!(body
        .get("student_id")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .starts_with("stu-"));
}

#[tokio::test]
async fn offers_route_returns_unprocessable_for_incomplete_offers() {
    let (ledger, store) = build_ledger();
    let router = offer_router(Arc::new(ledger));

    let response = router
        .oneshot(json_request(
            "POST",
            "/api/v1/offers",
            &json!({ "university": "MIT" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    let body = read_json_body(response).await;
    assert_eq!(body.get("success"), Some(&json!(false)));
    assert_eq!(body.get("student_id"), Some(&json!("")));
    assert!(store.raw(crate::workflows::offers::store::STUDENTS_KEY).is_none());
}

#[tokio::test]
async fn reconcile_handler_returns_internal_error_on_store_failure() {
    let ledger = Arc::new(OfferLedger::with_clock(
        Arc::new(UnavailableStore),
        FixedClock(fixed_now()),
    ));

    let response = crate::workflows::offers::router::reconcile_handler::<
        UnavailableStore,
        FixedClock,
    >(State(ledger), axum::Json(conditional_offer()))
    .await;

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let body = read_json_body(response).await;
    assert!(body
        .get("error")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .contains("storage offline"));
}

#[tokio::test]
async fn student_applications_route_lists_matching_applications() {
    let (ledger, _) = build_ledger();
    let outcome = ledger.reconcile(&conditional_offer()).expect("reconcile");
    ledger
        .reconcile(&rejection_with_deposit())
        .expect("second student");
    let router = offer_router(Arc::new(ledger));

    let response = router
        .oneshot(get_request(&format!(
            "/api/v1/students/{}/applications",
            outcome.student_id
        )))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    let applications = body.as_array().expect("array payload");
    assert_eq!(applications.len(), 1);
    assert_eq!(
        applications[0].get("university"),
        Some(&json!("University of Edinburgh"))
    );
}

#[tokio::test]
async fn task_status_route_marks_tasks_done() {
    let (ledger, _) = build_ledger();
    ledger.reconcile(&conditional_offer()).expect("reconcile");
    let task_id = ledger.tasks().expect("tasks")[0].task_id.clone();
    let ledger = Arc::new(ledger);
    let router = offer_router(ledger.clone());

    let response = router
        .oneshot(json_request(
            "PUT",
            &format!("/api/v1/tasks/{task_id}/status"),
            &json!({ "status": "done" }),
        ))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body.get("updated"), Some(&json!(true)));
    assert_eq!(body.get("status"), Some(&json!("done")));
    assert_eq!(ledger.tasks().expect("tasks")[0].status, TaskStatus::Done);
}

#[tokio::test]
async fn task_status_handler_reports_unknown_tasks() {
    let ledger = Arc::new(ledger_over(MemoryKeyValueStore::new()));

    let response = crate::workflows::offers::router::task_status_handler::<
        MemoryKeyValueStore,
        FixedClock,
    >(
        State(ledger),
        axum::extract::Path("task-unknown".to_string()),
        axum::Json(crate::workflows::offers::router::TaskStatusRequest {
            status: TaskStatus::Done,
        }),
    )
    .await;

    assert_eq!(response.status(), StatusCode::OK);
    let body = read_json_body(response).await;
    assert_eq!(body.get("updated"), Some(&json!(false)));
    assert_eq!(body.get("task_id"), Some(&json!("task-unknown")));
}

#[tokio::test]
async fn tasks_route_returns_empty_list_for_fresh_ledger() {
    let (ledger, _) = build_ledger();
    let router = offer_router(Arc::new(ledger));

    let response = router
        .oneshot(get_request("/api/v1/tasks"))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(read_json_body(response).await, json!([]));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_offer_posts_are_all_recorded() {
    let (ledger, _) = build_ledger();
    let ledger = Arc::new(ledger);
    let router = offer_router(ledger.clone());

    let requests: Vec<_> = (0..40)
        .map(|index| {
            let router = router.clone();
            tokio::spawn(async move {
                let payload = json!({
                    "studentName": format!("Student {index}"),
                    "university": "University of Bath",
                });
                router
                    .oneshot(json_request("POST", "/api/v1/offers", &payload))
                    .await
                    .expect("route executes")
                    .status()
            })
        })
        .collect();
    for request in requests {
        assert_eq!(request.await.expect("request task"), StatusCode::OK);
    }

    assert_eq!(ledger.students().expect("students").len(), 40);
}
