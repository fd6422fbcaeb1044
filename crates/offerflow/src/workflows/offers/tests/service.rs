use std::sync::Arc;
use std::thread;

use super::common::*;
use crate::workflows::offers::clock::FixedClock;
use crate::workflows::offers::domain::{TaskId, TaskStatus};
use crate::workflows::offers::extraction::ExtractionError;
use crate::workflows::offers::service::{IngestError, OfferLedger};
use crate::workflows::offers::store::{
    FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StoreError, APPLICATIONS_KEY,
    STUDENTS_KEY, TASKS_KEY,
};

#[test]
fn reuploading_a_letter_does_not_duplicate_tasks() {
    let (ledger, _) = build_ledger();

    let first = ledger.reconcile(&conditional_offer()).expect("first");
    let second = ledger.reconcile(&conditional_offer()).expect("second");

    assert_eq!(first.tasks_created, 2);
    assert_eq!(second.tasks_created, 0);

    let application_id = first.application_id.expect("application id");
    let tasks = ledger
        .tasks_for_application(&application_id)
        .expect("tasks");
    let condition_tasks = tasks
        .iter()
        .filter(|task| task.task_description.contains("IELTS 7.0"))
        .count();
    let deposit_tasks = tasks
        .iter()
        .filter(|task| task.task_description.contains("Pay deposit"))
        .count();
    assert_eq!(condition_tasks, 1);
    assert_eq!(deposit_tasks, 1);
    assert_eq!(tasks.len(), 2);
}

#[test]
fn rejected_offer_with_deadline_still_gets_a_deposit_task() {
    let (ledger, _) = build_ledger();

    let outcome = ledger
        .reconcile(&rejection_with_deposit())
        .expect("reconcile");

    assert_eq!(outcome.tasks_created, 1);
    let tasks = ledger.tasks().expect("tasks");
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].task_description, "Pay deposit (amount TBD)");
    assert_eq!(tasks[0].deadline.as_deref(), Some("2025-05-15"));
}

#[test]
fn collections_are_saved_students_then_applications_then_tasks() {
    let store = Arc::new(RecordingStore::default());
    let ledger = OfferLedger::with_clock(store.clone(), FixedClock(fixed_now()));

    ledger.reconcile(&conditional_offer()).expect("reconcile");

    assert_eq!(
        store.writes(),
        vec![
            STUDENTS_KEY.to_string(),
            APPLICATIONS_KEY.to_string(),
            TASKS_KEY.to_string()
        ]
    );
}

#[test]
fn task_status_update_persists_known_tasks() {
    let (ledger, _) = build_ledger();
    ledger.reconcile(&conditional_offer()).expect("reconcile");
    let task_id = ledger.tasks().expect("tasks")[0].task_id.clone();

    let updated = ledger
        .update_task_status(&task_id, TaskStatus::Done)
        .expect("update");

    assert!(updated);
    let tasks = ledger.tasks().expect("tasks");
    assert_eq!(tasks[0].status, TaskStatus::Done);
    assert_eq!(tasks[1].status, TaskStatus::Pending);

    ledger
        .update_task_status(&task_id, TaskStatus::Pending)
        .expect("reopen");
    assert_eq!(ledger.tasks().expect("tasks")[0].status, TaskStatus::Pending);
}

#[test]
fn task_status_update_ignores_unknown_ids_without_writing() {
    let store = Arc::new(RecordingStore::default());
    let ledger = OfferLedger::with_clock(store.clone(), FixedClock(fixed_now()));

    let updated = ledger
        .update_task_status(&TaskId("task-missing".to_string()), TaskStatus::Done)
        .expect("no-op update");

    assert!(!updated);
    assert!(store.writes().is_empty());
}

#[test]
fn store_failures_propagate_as_errors() {
    let ledger = OfferLedger::with_clock(Arc::new(UnavailableStore), FixedClock(fixed_now()));

    match ledger.reconcile(&conditional_offer()) {
        Err(StoreError::Unavailable(reason)) => assert_eq!(reason, "storage offline"),
        other => panic!("expected store error, got {other:?}"),
    }
}

#[test]
fn malformed_payload_aborts_reconciliation_before_any_write() {
    let store = MemoryKeyValueStore::new().with_entry(TASKS_KEY, "{\"task_id\": 42");
    let ledger = ledger_over(store);

    match ledger.reconcile(&conditional_offer()) {
        Err(StoreError::Integrity { collection, .. }) => assert_eq!(collection, TASKS_KEY),
        other => panic!("expected integrity error, got {other:?}"),
    }
    let substrate = ledger.store().substrate();
    assert!(substrate.raw(STUDENTS_KEY).is_none());
    assert!(substrate.raw(APPLICATIONS_KEY).is_none());
}

#[test]
fn ingest_document_reconciles_extracted_offer() {
    let (ledger, _) = build_ledger();
    let extractor = StubExtractor::Returns(conditional_offer());

    let outcome = ledger
        .ingest_document(&extractor, &pdf_document())
        .expect("ingest");

    assert!(outcome.success);
    assert_eq!(ledger.students().expect("students").len(), 1);
}

#[test]
fn ingest_document_passes_extraction_failures_through() {
    let (ledger, store) = build_ledger();
    let extractor = StubExtractor::Fails("quota exceeded".to_string());

    match ledger.ingest_document(&extractor, &pdf_document()) {
        Err(IngestError::Extraction(ExtractionError::Upstream(reason))) => {
            assert_eq!(reason, "quota exceeded")
        }
        other => panic!("expected extraction error, got {other:?}"),
    }
    assert!(store.raw(STUDENTS_KEY).is_none());
}

#[test]
fn query_helpers_preserve_insertion_order() {
    let (ledger, _) = build_ledger();
    let first = ledger.reconcile(&conditional_offer()).expect("first");
    ledger
        .reconcile(&rejection_with_deposit())
        .expect("second");
    ledger
        .reconcile(&unconditional_offer("Alice Tan", "King's College London"))
        .expect("third");

    let student_id = first.student_id;
    let applications = ledger
        .applications_for_student(&student_id)
        .expect("applications");
    assert_eq!(applications.len(), 2);
    assert_eq!(applications[0].university, "University of Edinburgh");
    assert_eq!(applications[1].university, "King's College London");

    let tasks = ledger
        .tasks_for_application(&applications[0].application_id)
        .expect("tasks");
    assert_eq!(tasks[0].task_description, "Satisfy offer condition: IELTS 7.0");
    assert_eq!(tasks[1].task_description, "Pay deposit (£2000)");

    assert!(ledger
        .tasks_for_application(&applications[1].application_id)
        .expect("tasks")
        .is_empty());
}

fn reconcile_from_threads<K>(
    ledger: Arc<OfferLedger<K, FixedClock>>,
    threads: usize,
    rounds: usize,
) where
    K: KeyValueStore + 'static,
{
    let workers: Vec<_> = (0..threads)
        .map(|worker| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                for round in 0..rounds {
                    let offer = unconditional_offer(
                        &format!("Student {worker}-{round}"),
                        "University of York",
                    );
                    let outcome = ledger.reconcile(&offer).expect("concurrent reconcile");
                    assert!(outcome.success);
                }
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker thread");
    }
}

#[test]
fn concurrent_reconciles_on_one_ledger_keep_every_student() {
    let (ledger, _) = build_ledger();
    let ledger = Arc::new(ledger);

    reconcile_from_threads(ledger.clone(), 16, 20);

    assert_eq!(ledger.students().expect("students").len(), 320);
    assert_eq!(ledger.applications().expect("applications").len(), 320);
}

#[test]
fn concurrent_reconciles_over_the_file_store_keep_it_readable() {
    let dir = tempfile::tempdir().expect("temp dir");
    let store = Arc::new(FileKeyValueStore::open(dir.path()).expect("open store"));
    let ledger = Arc::new(OfferLedger::with_clock(store, FixedClock(fixed_now())));

    reconcile_from_threads(ledger.clone(), 8, 10);

    assert_eq!(ledger.students().expect("students").len(), 80);
    assert_eq!(ledger.applications().expect("applications").len(), 80);
}

#[test]
fn concurrent_status_updates_are_all_kept() {
    let (ledger, _) = build_ledger();
    for index in 0..12 {
        let mut offer = conditional_offer();
        offer.student_name = Some(format!("Student {index}"));
        ledger.reconcile(&offer).expect("seed");
    }
    let ledger = Arc::new(ledger);
    let task_ids: Vec<_> = ledger
        .tasks()
        .expect("tasks")
        .into_iter()
        .map(|task| task.task_id)
        .collect();
    assert_eq!(task_ids.len(), 24);

    let workers: Vec<_> = task_ids
        .into_iter()
        .map(|task_id| {
            let ledger = ledger.clone();
            thread::spawn(move || {
                assert!(ledger
                    .update_task_status(&task_id, TaskStatus::Done)
                    .expect("update"));
            })
        })
        .collect();
    for worker in workers {
        worker.join().expect("worker thread");
    }

    assert!(ledger
        .tasks()
        .expect("tasks")
        .iter()
        .all(|task| task.status == TaskStatus::Done));
}
