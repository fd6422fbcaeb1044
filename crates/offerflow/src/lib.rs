//! Offer letter reconciliation for admissions consultants.
//!
//! Parsed offer letters are merged into persisted student, application and task
//! collections by [`workflows::offers::OfferLedger`]. The configuration, telemetry and
//! error modules carry the process-level plumbing shared by the service binary.

pub mod config;
pub mod error;
pub mod telemetry;
pub mod workflows;
