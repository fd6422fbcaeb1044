use crate::infra::{open_ledger, parse_task_status};
use chrono::{DateTime, Utc};
use clap::Args;
use offerflow::error::AppError;
use offerflow::workflows::offers::{
    decode_extraction_response, Application, ApplicationId, Clock, KeyValueStore, OfferLedger,
    OfferStatus, OfferType, ReconciliationOutcome, TaskId, TaskStatus,
};
use std::collections::HashMap;
use std::path::PathBuf;

#[derive(Args, Debug)]
pub(crate) struct IngestArgs {
    /// Extraction JSON payload (a fenced ```json block is accepted)
    pub(crate) path: PathBuf,
}

#[derive(Args, Debug, Default)]
pub(crate) struct TasksArgs {
    /// Only list tasks that are still pending
    #[arg(long)]
    pub(crate) pending: bool,
}

#[derive(Args, Debug)]
pub(crate) struct TaskStatusArgs {
    /// Task identifier, e.g. task-1a2b3c4d5e6f
    pub(crate) task_id: String,
    /// New status (pending|done)
    #[arg(value_parser = parse_task_status)]
    pub(crate) status: TaskStatus,
}

pub(crate) fn run_ingest(args: IngestArgs, data_dir: Option<PathBuf>) -> Result<(), AppError> {
    let ledger = open_ledger(data_dir)?;
    let payload = std::fs::read_to_string(&args.path)?;
    let parsed = decode_extraction_response(&payload)?;

    let outcome = ledger.reconcile(&parsed)?;
    render_outcome(&outcome);
    if !outcome.success {
        return Err(AppError::IncompleteOffer(outcome.message));
    }
    Ok(())
}

pub(crate) fn run_students(data_dir: Option<PathBuf>) -> Result<(), AppError> {
    let ledger = open_ledger(data_dir)?;
    render_students(&ledger)
}

pub(crate) fn run_tasks(args: TasksArgs, data_dir: Option<PathBuf>) -> Result<(), AppError> {
    let ledger = open_ledger(data_dir)?;
    render_tasks(&ledger, args.pending)
}

pub(crate) fn run_task_status(
    args: TaskStatusArgs,
    data_dir: Option<PathBuf>,
) -> Result<(), AppError> {
    let ledger = open_ledger(data_dir)?;
    let task_id = TaskId(args.task_id);

    if ledger.update_task_status(&task_id, args.status)? {
        println!("Task {task_id} marked {}", args.status.label());
    } else {
        println!("No task with id {task_id}; nothing changed");
    }
    Ok(())
}

pub(crate) fn render_outcome(outcome: &ReconciliationOutcome) {
    if !outcome.success {
        println!("Offer not recorded: {}", outcome.message);
        return;
    }

    println!("{}", outcome.message);
    println!("- student: {}", outcome.student_id);
    if let Some(application_id) = &outcome.application_id {
        println!("- application: {application_id}");
    }
    println!("- tasks created: {}", outcome.tasks_created);
}

pub(crate) fn render_students<K, C>(ledger: &OfferLedger<K, C>) -> Result<(), AppError>
where
    K: KeyValueStore,
    C: Clock,
{
    let students = ledger.students()?;
    if students.is_empty() {
        println!("No students recorded yet.");
        return Ok(());
    }

    println!("Students ({})", students.len());
    for student in &students {
        let consultant = student.consultant_name.as_deref().unwrap_or("unassigned");
        println!(
            "- {} [{}] consultant: {}",
            student.name, student.student_id, consultant
        );
        for application in ledger.applications_for_student(&student.student_id)? {
            println!("    {}", describe_application(&application));
        }
    }
    Ok(())
}

pub(crate) fn render_tasks<K, C>(
    ledger: &OfferLedger<K, C>,
    pending_only: bool,
) -> Result<(), AppError>
where
    K: KeyValueStore,
    C: Clock,
{
    let students: HashMap<_, _> = ledger
        .students()?
        .into_iter()
        .map(|student| (student.student_id, student.name))
        .collect();
    let context: HashMap<ApplicationId, String> = ledger
        .applications()?
        .into_iter()
        .map(|application| {
            let student = students
                .get(&application.student_id)
                .map(String::as_str)
                .unwrap_or("unknown student");
            let label = format!("{student} / {}", application.university);
            (application.application_id, label)
        })
        .collect();

    let tasks: Vec<_> = ledger
        .tasks()?
        .into_iter()
        .filter(|task| !pending_only || task.status == TaskStatus::Pending)
        .collect();
    if tasks.is_empty() {
        println!("No tasks to show.");
        return Ok(());
    }

    println!("Tasks ({})", tasks.len());
    for task in &tasks {
        let owner = context
            .get(&task.application_id)
            .map(String::as_str)
            .unwrap_or("unknown application");
        let deadline = task
            .deadline
            .as_deref()
            .map(|deadline| format!(" due {deadline}"))
            .unwrap_or_default();
        println!(
            "- [{}] {}{} ({}) {}",
            task.status.label(),
            task.task_description,
            deadline,
            owner,
            task.task_id
        );
    }
    Ok(())
}

fn describe_application(application: &Application) -> String {
    let mut line = format!(
        "{} | {} | {}",
        application.university,
        application.program,
        offer_label(application.offer_status, application.offer_type)
    );
    if let Some(deadline) = &application.deposit_deadline {
        let amount = application.deposit_amount.as_deref().unwrap_or("amount TBD");
        line.push_str(&format!(" | deposit {amount} by {deadline}"));
    }
    if let Some(updated) = DateTime::<Utc>::from_timestamp_millis(application.last_updated_timestamp)
    {
        line.push_str(&format!(" | updated {}", updated.format("%Y-%m-%d %H:%M UTC")));
    }
    line
}

fn offer_label(status: OfferStatus, offer_type: OfferType) -> String {
    match (status, offer_type) {
        (OfferStatus::Offer, OfferType::Conditional | OfferType::Unconditional) => {
            format!("{} ({})", status.label(), offer_type.label())
        }
        _ => status.label().to_string(),
    }
}
