use crate::commands::{render_outcome, render_students, render_tasks};
use offerflow::error::AppError;
use offerflow::workflows::offers::{
    MemoryKeyValueStore, OfferLedger, ParsedOfferRecord, TaskStatus,
};
use std::sync::Arc;

/// Offer letters as the extractor would hand them over: a conditional offer, its
/// unconditional follow-up, a second university for the same student and a rejection.
pub(crate) fn sample_offers() -> Vec<ParsedOfferRecord> {
    vec![
        ParsedOfferRecord {
            student_name: Some("Mei Lin".to_string()),
            university: Some("University of Bristol".to_string()),
            program: Some("MSc Financial Technology".to_string()),
            offer_type: Some("Conditional".to_string()),
            conditions: Some(vec![
                "IELTS 6.5 with no component below 6.0".to_string(),
                "Degree certificate".to_string(),
            ]),
            deposit_amount: Some("£1000".to_string()),
            deposit_deadline: Some("2025-06-30".to_string()),
            start_term: Some("September 2025".to_string()),
            offer_date: Some("2025-03-10".to_string()),
            school_id: Some("2419876".to_string()),
            next_steps: Some(vec!["Accept the offer online".to_string()]),
            key_sentences: Some("Your offer is subject to the conditions below.".to_string()),
        },
        ParsedOfferRecord {
            student_name: Some("MEI LIN".to_string()),
            university: Some("university of bristol".to_string()),
            program: None,
            offer_type: Some("Unconditional".to_string()),
            deposit_amount: Some("£1000".to_string()),
            deposit_deadline: Some("2025-06-30".to_string()),
            offer_date: Some("2025-05-02".to_string()),
            ..ParsedOfferRecord::default()
        },
        ParsedOfferRecord {
            student_name: Some("Mei Lin".to_string()),
            university: Some("University of Warwick".to_string()),
            program: Some("MSc Business Analytics".to_string()),
            offer_type: Some("Waitlist".to_string()),
            ..ParsedOfferRecord::default()
        },
        ParsedOfferRecord {
            student_name: Some("Jun Zhao".to_string()),
            university: Some("London School of Economics".to_string()),
            program: Some("MSc Economics".to_string()),
            offer_type: Some("Reject".to_string()),
            deposit_deadline: Some("2025-04-15".to_string()),
            ..ParsedOfferRecord::default()
        },
    ]
}

pub(crate) fn run_demo() -> Result<(), AppError> {
    let ledger = OfferLedger::new(Arc::new(MemoryKeyValueStore::new()));

    println!("Offer reconciliation demo");
    for (index, offer) in sample_offers().iter().enumerate() {
        println!(
            "\nLetter {}: {} / {}",
            index + 1,
            offer.student_name.as_deref().unwrap_or("?"),
            offer.university.as_deref().unwrap_or("?")
        );
        let outcome = ledger.reconcile(offer)?;
        render_outcome(&outcome);
    }

    let tasks = ledger.tasks()?;
    if let Some(first) = tasks.first() {
        ledger.update_task_status(&first.task_id, TaskStatus::Done)?;
        println!("\nMarked '{}' done", first.task_description);
    }

    println!();
    render_students(&ledger)?;
    println!();
    render_tasks(&ledger, true)?;
    Ok(())
}
