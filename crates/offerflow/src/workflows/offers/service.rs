use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::clock::{Clock, SystemClock};
use super::domain::{Application, ApplicationId, Student, StudentId, Task, TaskId, TaskStatus};
use super::extraction::{ExtractionError, OfferDocument, OfferExtractor, ParsedOfferRecord};
use super::query;
use super::reconcile::{reconcile_into, validate, LedgerSnapshot, ReconciliationKind};
use super::store::{Applications, EntityStore, KeyValueStore, StoreError, Students, Tasks};

/// User-facing result of one reconciliation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationOutcome {
    pub success: bool,
    pub message: String,
    /// Empty when the offer could not be reconciled.
    pub student_id: StudentId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub application_id: Option<ApplicationId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ReconciliationKind>,
    #[serde(default)]
    pub tasks_created: usize,
}

impl ReconciliationOutcome {
    fn rejected(message: String) -> Self {
        Self {
            success: false,
            message,
            student_id: StudentId(String::new()),
            application_id: None,
            kind: None,
            tasks_created: 0,
        }
    }
}

/// Ledger of students, applications and tasks backed by an injected key-value store.
///
/// Mutations are load-modify-save sequences over whole collections. They are serialised
/// per ledger, so concurrent requests sharing one ledger never lose each other's writes.
/// Separate ledgers or processes over the same substrate are not coordinated.
pub struct OfferLedger<K, C = SystemClock> {
    store: EntityStore<K>,
    clock: C,
    write_lock: Mutex<()>,
}

impl<K: KeyValueStore> OfferLedger<K> {
    pub fn new(kv: Arc<K>) -> Self {
        Self::with_clock(kv, SystemClock)
    }
}

impl<K, C> OfferLedger<K, C>
where
    K: KeyValueStore,
    C: Clock,
{
    pub fn with_clock(kv: Arc<K>, clock: C) -> Self {
        Self {
            store: EntityStore::new(kv),
            clock,
            write_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &EntityStore<K> {
        &self.store
    }

    /// Merge a parsed offer into the ledger.
    ///
    /// Missing identifying fields produce an unsuccessful outcome without touching
    /// the store. Store failures are returned as errors.
    pub fn reconcile(
        &self,
        parsed: &ParsedOfferRecord,
    ) -> Result<ReconciliationOutcome, StoreError> {
        let key = match validate(parsed) {
            Ok(key) => key,
            Err(error) => {
                warn!(%error, "rejected incomplete offer");
                return Ok(ReconciliationOutcome::rejected(error.to_string()));
            }
        };

        let _guard = self.lock_writes();
        let mut snapshot = self.load_snapshot()?;
        let reconciled = reconcile_into(&mut snapshot, parsed, key, self.clock.now());

        self.store.save_all::<Students>(&snapshot.students)?;
        self.store.save_all::<Applications>(&snapshot.applications)?;
        self.store.save_all::<Tasks>(&snapshot.tasks)?;

        info!(
            kind = ?reconciled.kind,
            student_id = %reconciled.student_id,
            application_id = %reconciled.application_id,
            tasks_created = reconciled.tasks_created,
            "offer reconciled"
        );

        Ok(ReconciliationOutcome {
            success: true,
            message: reconciled.kind.message().to_string(),
            student_id: reconciled.student_id,
            application_id: Some(reconciled.application_id),
            kind: Some(reconciled.kind),
            tasks_created: reconciled.tasks_created,
        })
    }

    /// Extract a document and reconcile the result. Extraction errors pass through untouched.
    ///
    /// This is the entry point for callers holding an uploaded letter and an
    /// [`OfferExtractor`] implementation. Callers that already hold the extractor's JSON
    /// decode it with [`decode_extraction_response`] and call [`OfferLedger::reconcile`].
    ///
    /// [`decode_extraction_response`]: super::extraction::decode_extraction_response
    pub fn ingest_document<E>(
        &self,
        extractor: &E,
        document: &OfferDocument,
    ) -> Result<ReconciliationOutcome, IngestError>
    where
        E: OfferExtractor + ?Sized,
    {
        let parsed = extractor.extract(document)?;
        Ok(self.reconcile(&parsed)?)
    }

    /// Set a task's status. Unknown ids are ignored and nothing is written.
    pub fn update_task_status(
        &self,
        task_id: &TaskId,
        status: TaskStatus,
    ) -> Result<bool, StoreError> {
        let _guard = self.lock_writes();
        let mut tasks = self.store.tasks()?;
        let Some(task) = tasks.iter_mut().find(|task| &task.task_id == task_id) else {
            return Ok(false);
        };

        task.status = status;
        self.store.save_all::<Tasks>(&tasks)?;
        Ok(true)
    }

    pub fn students(&self) -> Result<Vec<Student>, StoreError> {
        self.store.students()
    }

    pub fn applications(&self) -> Result<Vec<Application>, StoreError> {
        self.store.applications()
    }

    pub fn tasks(&self) -> Result<Vec<Task>, StoreError> {
        self.store.tasks()
    }

    pub fn applications_for_student(
        &self,
        student_id: &StudentId,
    ) -> Result<Vec<Application>, StoreError> {
        Ok(query::applications_for_student(
            &self.store.applications()?,
            student_id,
        ))
    }

    pub fn tasks_for_application(
        &self,
        application_id: &ApplicationId,
    ) -> Result<Vec<Task>, StoreError> {
        Ok(query::tasks_for_application(
            &self.store.tasks()?,
            application_id,
        ))
    }

    // the guard protects no data, so a poisoned lock is still usable
    fn lock_writes(&self) -> MutexGuard<'_, ()> {
        self.write_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    fn load_snapshot(&self) -> Result<LedgerSnapshot, StoreError> {
        Ok(LedgerSnapshot {
            students: self.store.students()?,
            applications: self.store.applications()?,
            tasks: self.store.tasks()?,
        })
    }
}

/// Error raised by [`OfferLedger::ingest_document`].
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),
    #[error(transparent)]
    Store(#[from] StoreError),
}
