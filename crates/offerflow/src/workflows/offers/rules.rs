//! Follow-up task generation for a reconciled application.
//!
//! Rules only ever append. Re-uploading the same letter must not duplicate work, so
//! each rule first looks for an existing task of the application carrying its marker.

use tracing::debug;

use super::domain::{ApplicationId, Task, TaskStatus};
use super::extraction::{non_blank, ParsedOfferRecord};
use super::ids::next_task_id;

/// Raw offer label that enables condition tasks. Matched exactly, not via the classifier.
pub const CONDITIONAL_OFFER_TAG: &str = "Conditional";
pub const CONDITION_TASK_PREFIX: &str = "Satisfy offer condition: ";
pub const DEPOSIT_TASK_MARKER: &str = "Pay deposit";
const DEPOSIT_AMOUNT_PLACEHOLDER: &str = "amount TBD";

/// Wording of deposit tasks recorded by the earlier Chinese-language dashboard.
const LEGACY_DEPOSIT_MARKER: &str = "缴纳押金";

fn application_has_task_containing(
    tasks: &[Task],
    application_id: &ApplicationId,
    needle: &str,
) -> bool {
    tasks.iter().any(|task| {
        &task.application_id == application_id && task.task_description.contains(needle)
    })
}

fn pending_task(
    application_id: &ApplicationId,
    description: String,
    deadline: Option<String>,
) -> Task {
    Task {
        task_id: next_task_id(),
        application_id: application_id.clone(),
        task_description: description,
        deadline,
        status: TaskStatus::Pending,
    }
}

pub fn condition_task_description(condition: &str) -> String {
    format!("{CONDITION_TASK_PREFIX}{condition}")
}

pub fn deposit_task_description(amount: Option<&str>) -> String {
    let amount = non_blank(amount).unwrap_or(DEPOSIT_AMOUNT_PLACEHOLDER);
    format!("{DEPOSIT_TASK_MARKER} ({amount})")
}

/// Rule A: one task per stated condition of a conditional offer.
pub(crate) fn apply_condition_rule(
    parsed: &ParsedOfferRecord,
    application_id: &ApplicationId,
    tasks: &mut Vec<Task>,
) -> usize {
    if parsed.offer_type.as_deref() != Some(CONDITIONAL_OFFER_TAG) {
        return 0;
    }
    let Some(conditions) = parsed.conditions.as_deref() else {
        return 0;
    };

    let mut created = 0;
    for condition in conditions.iter().filter_map(|c| non_blank(Some(c.as_str()))) {
        if application_has_task_containing(tasks, application_id, condition) {
            debug!(%application_id, condition, "condition task already present");
            continue;
        }

        tasks.push(pending_task(
            application_id,
            condition_task_description(condition),
            None,
        ));
        created += 1;
    }

    created
}

/// Rule B: a single deposit reminder whenever a deadline is known.
///
/// An existing deposit task is left untouched, including its deadline, even when a
/// later letter states a different one.
pub(crate) fn apply_deposit_rule(
    parsed: &ParsedOfferRecord,
    application_id: &ApplicationId,
    tasks: &mut Vec<Task>,
) -> usize {
    let Some(deadline) = non_blank(parsed.deposit_deadline.as_deref()) else {
        return 0;
    };

    let exists = [DEPOSIT_TASK_MARKER, LEGACY_DEPOSIT_MARKER]
        .iter()
        .any(|marker| application_has_task_containing(tasks, application_id, marker));
    if exists {
        debug!(%application_id, "deposit task already present");
        return 0;
    }

    tasks.push(pending_task(
        application_id,
        deposit_task_description(parsed.deposit_amount.as_deref()),
        Some(deadline.to_string()),
    ));
    1
}

/// Runs every rule against the application and returns the number of tasks appended.
pub(crate) fn apply_task_rules(
    parsed: &ParsedOfferRecord,
    application_id: &ApplicationId,
    tasks: &mut Vec<Task>,
) -> usize {
    apply_condition_rule(parsed, application_id, tasks)
        + apply_deposit_rule(parsed, application_id, tasks)
}
