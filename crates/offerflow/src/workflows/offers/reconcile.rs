//! In-memory reconciliation of one parsed offer against loaded collections.
//!
//! The dedup keys are the case-insensitive student name, then the student id plus
//! the case-insensitive university. Program is deliberately not part of the
//! application key, and there is no fuzzy matching: a misspelt name yields a second
//! student.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::domain::{
    Application, ApplicationId, OfferStatus, OfferType, Student, StudentId, Task,
};
use super::extraction::{non_blank, ParsedOfferRecord};
use super::ids::{next_application_id, next_student_id};
use super::rules::apply_task_rules;

pub const UNASSIGNED_CONSULTANT: &str = "unassigned";
pub const AUTO_CREATED_NOTE: &str = "Created automatically from a parsed offer letter";
pub const DEFAULT_PROGRAM: &str = "General Application";

const OFFER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Raised when the identifying fields of a parsed offer are missing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum IncompleteDataError {
    #[error("incomplete offer data: no student name found in the document")]
    MissingStudentName,
    #[error("incomplete offer data: no university name found in the document")]
    MissingUniversity,
}

/// How a successful reconciliation changed the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReconciliationKind {
    NewStudent,
    NewApplication,
    UpdatedApplication,
}

impl ReconciliationKind {
    pub const fn message(self) -> &'static str {
        match self {
            ReconciliationKind::NewStudent => {
                "New student profile created and offer details recorded."
            }
            ReconciliationKind::NewApplication => {
                "Offer recorded as a new application for an existing student."
            }
            ReconciliationKind::UpdatedApplication => "Existing student application updated.",
        }
    }
}

/// Loaded copy of the three collections.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct LedgerSnapshot {
    pub(crate) students: Vec<Student>,
    pub(crate) applications: Vec<Application>,
    pub(crate) tasks: Vec<Task>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reconciled {
    pub(crate) kind: ReconciliationKind,
    pub(crate) student_id: StudentId,
    pub(crate) application_id: ApplicationId,
    pub(crate) tasks_created: usize,
}

/// Identifying fields of a parsed offer, trimmed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct OfferKey<'a> {
    pub(crate) student_name: &'a str,
    pub(crate) university: &'a str,
}

pub(crate) fn validate(parsed: &ParsedOfferRecord) -> Result<OfferKey<'_>, IncompleteDataError> {
    let student_name = non_blank(parsed.student_name.as_deref())
        .ok_or(IncompleteDataError::MissingStudentName)?;
    let university =
        non_blank(parsed.university.as_deref()).ok_or(IncompleteDataError::MissingUniversity)?;

    Ok(OfferKey {
        student_name,
        university,
    })
}

/// Fields every reconciliation writes, whether the application is new or not.
struct OfferFields {
    offer_status: OfferStatus,
    offer_type: OfferType,
    offer_date: String,
    deposit_amount: Option<String>,
    deposit_deadline: Option<String>,
    tasks_to_do: Vec<String>,
    raw_pdf_text: Option<String>,
    school_id_ref: Option<String>,
}

impl OfferFields {
    fn from_parsed(parsed: &ParsedOfferRecord, now: DateTime<Utc>) -> Self {
        let owned = |value: Option<&str>| non_blank(value).map(str::to_string);

        Self {
            offer_status: OfferStatus::classify(parsed.offer_type.as_deref()),
            offer_type: OfferType::classify(parsed.offer_type.as_deref()),
            offer_date: owned(parsed.offer_date.as_deref())
                .unwrap_or_else(|| now.date_naive().format(OFFER_DATE_FORMAT).to_string()),
            deposit_amount: owned(parsed.deposit_amount.as_deref()),
            deposit_deadline: owned(parsed.deposit_deadline.as_deref()),
            tasks_to_do: parsed
                .next_steps
                .iter()
                .flatten()
                .filter_map(|step| owned(Some(step.as_str())))
                .collect(),
            raw_pdf_text: owned(parsed.key_sentences.as_deref()),
            school_id_ref: owned(parsed.school_id.as_deref()),
        }
    }

    /// Last write wins; absent values clear what was stored.
    fn overwrite(self, application: &mut Application, timestamp: i64) {
        application.offer_status = self.offer_status;
        application.offer_type = self.offer_type;
        application.offer_date = Some(self.offer_date);
        application.deposit_amount = self.deposit_amount;
        application.deposit_deadline = self.deposit_deadline;
        application.tasks_to_do = self.tasks_to_do;
        application.raw_pdf_text = self.raw_pdf_text;
        application.school_id_ref = self.school_id_ref;
        application.last_updated_timestamp = application.last_updated_timestamp.max(timestamp);
    }
}

fn resolve_student(students: &mut Vec<Student>, name: &str) -> (StudentId, bool) {
    if let Some(existing) = students.iter().find(|student| student.matches_name(name)) {
        return (existing.student_id.clone(), false);
    }

    let student = Student {
        student_id: next_student_id(),
        name: name.to_string(),
        contact: None,
        consultant_name: Some(UNASSIGNED_CONSULTANT.to_string()),
        notes: Some(AUTO_CREATED_NOTE.to_string()),
    };
    let student_id = student.student_id.clone();
    info!(%student_id, "created student from parsed offer");
    students.push(student);
    (student_id, true)
}

fn resolve_application(
    applications: &mut Vec<Application>,
    student_id: &StudentId,
    university: &str,
    parsed: &ParsedOfferRecord,
    now: DateTime<Utc>,
) -> (ApplicationId, bool) {
    let fields = OfferFields::from_parsed(parsed, now);
    let timestamp = now.timestamp_millis();

    if let Some(application) = applications
        .iter_mut()
        .find(|application| application.matches(student_id, university))
    {
        fields.overwrite(application, timestamp);
        // a blank re-parse never erases a known program
        if let Some(program) = non_blank(parsed.program.as_deref()) {
            application.program = program.to_string();
        }
        debug!(application_id = %application.application_id, "updated application");
        return (application.application_id.clone(), false);
    }

    let mut application = Application {
        application_id: next_application_id(),
        student_id: student_id.clone(),
        university: university.to_string(),
        program: non_blank(parsed.program.as_deref())
            .unwrap_or(DEFAULT_PROGRAM)
            .to_string(),
        offer_status: OfferStatus::None,
        offer_type: OfferType::Unknown,
        offer_date: None,
        deposit_amount: None,
        deposit_deadline: None,
        tasks_to_do: Vec::new(),
        raw_pdf_text: None,
        last_updated_timestamp: timestamp,
        school_id_ref: None,
    };
    fields.overwrite(&mut application, timestamp);

    let application_id = application.application_id.clone();
    info!(%application_id, %student_id, university, "created application from parsed offer");
    applications.push(application);
    (application_id, true)
}

/// Resolves the student and application, merges fields and appends generated tasks.
pub(crate) fn reconcile_into(
    snapshot: &mut LedgerSnapshot,
    parsed: &ParsedOfferRecord,
    key: OfferKey<'_>,
    now: DateTime<Utc>,
) -> Reconciled {
    let (student_id, new_student) = resolve_student(&mut snapshot.students, key.student_name);
    let (application_id, new_application) = resolve_application(
        &mut snapshot.applications,
        &student_id,
        key.university,
        parsed,
        now,
    );
    let tasks_created = apply_task_rules(parsed, &application_id, &mut snapshot.tasks);

    let kind = if new_student {
        ReconciliationKind::NewStudent
    } else if new_application {
        ReconciliationKind::NewApplication
    } else {
        ReconciliationKind::UpdatedApplication
    };

    Reconciled {
        kind,
        student_id,
        application_id,
        tasks_created,
    }
}
