use std::sync::{Arc, Mutex};

use axum::response::Response;
use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;

use crate::workflows::offers::clock::FixedClock;
use crate::workflows::offers::extraction::{
    ExtractionError, OfferDocument, OfferExtractor, ParsedOfferRecord,
};
use crate::workflows::offers::service::OfferLedger;
use crate::workflows::offers::store::{KeyValueStore, MemoryKeyValueStore, StoreError};

pub(super) fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 20, 9, 30, 0)
        .single()
        .expect("valid instant")
}

pub(super) fn build_ledger() -> (
    OfferLedger<MemoryKeyValueStore, FixedClock>,
    Arc<MemoryKeyValueStore>,
) {
    let store = Arc::new(MemoryKeyValueStore::new());
    let ledger = OfferLedger::with_clock(store.clone(), FixedClock(fixed_now()));
    (ledger, store)
}

pub(super) fn ledger_over(
    store: MemoryKeyValueStore,
) -> OfferLedger<MemoryKeyValueStore, FixedClock> {
    OfferLedger::with_clock(Arc::new(store), FixedClock(fixed_now()))
}

pub(super) fn conditional_offer() -> ParsedOfferRecord {
    ParsedOfferRecord {
        student_name: Some("Alice Tan".to_string()),
        university: Some("University of Edinburgh".to_string()),
        program: Some("MSc Data Science".to_string()),
        offer_type: Some("Conditional".to_string()),
        conditions: Some(vec!["IELTS 7.0".to_string()]),
        deposit_amount: Some("£2000".to_string()),
        deposit_deadline: Some("2025-06-01".to_string()),
        start_term: Some("September 2025".to_string()),
        offer_date: Some("2025-03-14".to_string()),
        school_id: Some("S1234567".to_string()),
        next_steps: Some(vec!["Accept the offer in the applicant portal".to_string()]),
        key_sentences: Some("We are pleased to make you a conditional offer.".to_string()),
    }
}

pub(super) fn unconditional_offer(student: &str, university: &str) -> ParsedOfferRecord {
    ParsedOfferRecord {
        student_name: Some(student.to_string()),
        university: Some(university.to_string()),
        program: Some("MEng Software Engineering".to_string()),
        offer_type: Some("Unconditional".to_string()),
        ..ParsedOfferRecord::default()
    }
}

pub(super) fn rejection_with_deposit() -> ParsedOfferRecord {
    ParsedOfferRecord {
        student_name: Some("Bo Chen".to_string()),
        university: Some("Imperial College London".to_string()),
        offer_type: Some("Reject".to_string()),
        deposit_deadline: Some("2025-05-15".to_string()),
        ..ParsedOfferRecord::default()
    }
}

/// Substrate whose every call fails, for error propagation checks.
pub(super) struct UnavailableStore;

impl KeyValueStore for UnavailableStore {
    fn get(&self, _key: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Unavailable("storage offline".to_string()))
    }

    fn set(&self, _key: &str, _value: &str) -> Result<(), StoreError> {
        Err(StoreError::Unavailable("storage offline".to_string()))
    }
}

/// Records every write so tests can check the save order.
#[derive(Default)]
pub(super) struct RecordingStore {
    inner: MemoryKeyValueStore,
    writes: Mutex<Vec<String>>,
}

impl RecordingStore {
    pub(super) fn writes(&self) -> Vec<String> {
        self.writes.lock().expect("writes mutex poisoned").clone()
    }
}

impl KeyValueStore for RecordingStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        self.inner.get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        self.writes
            .lock()
            .expect("writes mutex poisoned")
            .push(key.to_string());
        self.inner.set(key, value)
    }
}

pub(super) enum StubExtractor {
    Returns(ParsedOfferRecord),
    Fails(String),
}

impl OfferExtractor for StubExtractor {
    fn extract(&self, _document: &OfferDocument) -> Result<ParsedOfferRecord, ExtractionError> {
        match self {
            StubExtractor::Returns(record) => Ok(record.clone()),
            StubExtractor::Fails(reason) => Err(ExtractionError::Upstream(reason.clone())),
        }
    }
}

pub(super) fn pdf_document() -> OfferDocument {
    OfferDocument::new(b"%PDF-1.7 offer".to_vec(), mime::APPLICATION_PDF).expect("pdf accepted")
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
