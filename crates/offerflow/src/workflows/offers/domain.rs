use std::fmt;

use serde::{Deserialize, Serialize};

/// Identifier wrapper for students.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StudentId(pub String);

/// Identifier wrapper for applications.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ApplicationId(pub String);

/// Identifier wrapper for follow-up tasks.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub String);

impl fmt::Display for StudentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for ApplicationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A student tracked by the consultancy. `name` is the case-insensitive dedup key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Student {
    pub student_id: StudentId,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub consultant_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

impl Student {
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// Coarse outcome of a university application.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OfferStatus {
    #[default]
    None,
    Offer,
    Reject,
    Waitlist,
}

impl OfferStatus {
    pub const fn label(self) -> &'static str {
        match self {
            OfferStatus::None => "None",
            OfferStatus::Offer => "Offer",
            OfferStatus::Reject => "Reject",
            OfferStatus::Waitlist => "Waitlist",
        }
    }
}

/// Conditionality of an accepted offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum OfferType {
    Conditional,
    Unconditional,
    #[default]
    Unknown,
}

impl OfferType {
    pub const fn label(self) -> &'static str {
        match self {
            OfferType::Conditional => "Conditional",
            OfferType::Unconditional => "Unconditional",
            OfferType::Unknown => "Unknown",
        }
    }
}

/// One application slot per student and university.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Application {
    pub application_id: ApplicationId,
    pub student_id: StudentId,
    pub university: String,
    pub program: String,
    pub offer_status: OfferStatus,
    pub offer_type: OfferType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offer_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_amount: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deposit_deadline: Option<String>,
    /// Next steps copied from the letter. Task entities are the source of truth.
    #[serde(default)]
    pub tasks_to_do: Vec<String>,
    /// Verification excerpt from the letter.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_pdf_text: Option<String>,
    /// Epoch milliseconds of the last write.
    pub last_updated_timestamp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub school_id_ref: Option<String>,
}

impl Application {
    pub fn matches(&self, student_id: &StudentId, university: &str) -> bool {
        &self.student_id == student_id
            && self.university.to_lowercase() == university.to_lowercase()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Done,
}

impl TaskStatus {
    pub const fn label(self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Done => "done",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" | "todo" | "open" => Some(Self::Pending),
            "done" | "complete" | "completed" => Some(Self::Done),
            _ => None,
        }
    }
}

/// Follow-up action attached to an application.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub task_id: TaskId,
    pub application_id: ApplicationId,
    pub task_description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deadline: Option<String>,
    pub status: TaskStatus,
}
