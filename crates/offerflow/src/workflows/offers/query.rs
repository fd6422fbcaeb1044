use super::domain::{Application, ApplicationId, StudentId, Task};

/// Applications of one student, in stored order.
pub fn applications_for_student(
    applications: &[Application],
    student_id: &StudentId,
) -> Vec<Application> {
    applications
        .iter()
        .filter(|application| &application.student_id == student_id)
        .cloned()
        .collect()
}

/// Tasks of one application, in stored order.
pub fn tasks_for_application(tasks: &[Task], application_id: &ApplicationId) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| &task.application_id == application_id)
        .cloned()
        .collect()
}
