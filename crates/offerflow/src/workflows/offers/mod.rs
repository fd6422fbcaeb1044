//! Offer letter reconciliation.
//!
//! A [`ParsedOfferRecord`] produced by the extraction collaborator is merged into the
//! student, application and task collections by [`OfferLedger::reconcile`]. Students
//! and applications are found or created by their dedup keys, offer fields are merged
//! last-write-wins, and follow-up tasks are derived by idempotent rules.

mod classify;
mod clock;
pub mod domain;
pub mod extraction;
mod ids;
pub mod query;
mod reconcile;
pub mod router;
pub(crate) mod rules;
pub mod service;
pub mod store;

#[cfg(test)]
mod tests;

pub use classify::{classify_offer_status, classify_offer_type};
pub use clock::{Clock, FixedClock, SystemClock};
pub use domain::{
    Application, ApplicationId, OfferStatus, OfferType, Student, StudentId, Task, TaskId,
    TaskStatus,
};
pub use extraction::{
    decode_extraction_response, ExtractionError, OfferDocument, OfferExtractor, ParsedOfferRecord,
};
pub use ids::generate_id;
pub use query::{applications_for_student, tasks_for_application};
pub use reconcile::{
    IncompleteDataError, ReconciliationKind, AUTO_CREATED_NOTE, DEFAULT_PROGRAM,
    UNASSIGNED_CONSULTANT,
};
pub use router::offer_router;
pub use rules::{
    condition_task_description, deposit_task_description, CONDITIONAL_OFFER_TAG,
    CONDITION_TASK_PREFIX, DEPOSIT_TASK_MARKER,
};
pub use service::{IngestError, OfferLedger, ReconciliationOutcome};
pub use store::{
    EntityStore, FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, StoreError,
    APPLICATIONS_KEY, STUDENTS_KEY, TASKS_KEY,
};
