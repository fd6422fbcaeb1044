use uuid::Uuid;

use super::domain::{ApplicationId, StudentId, TaskId};

const TOKEN_LEN: usize = 12;

/// Returns `<prefix>-<12 hex chars>`. The prefix keeps identifiers apart from
/// free-text values such as names or program titles.
pub fn generate_id(prefix: &str) -> String {
    let token = Uuid::new_v4().simple().to_string();
    format!("{prefix}-{}", &token[..TOKEN_LEN])
}

pub(crate) fn next_student_id() -> StudentId {
    StudentId(generate_id("stu"))
}

pub(crate) fn next_application_id() -> ApplicationId {
    ApplicationId(generate_id("app"))
}

pub(crate) fn next_task_id() -> TaskId {
    TaskId(generate_id("task"))
}
