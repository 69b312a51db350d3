//! lead-audit - Batch validation of scraped court-record snapshots
//!
//! This crate cross-references XML lead manifests against the decoded HTML
//! snapshots captured for each lead and produces a per-batch discrepancy
//! report. The decode / extract / compare pipeline is shared; the field
//! sets and extraction rules differ per tool variant.

// Module declarations
pub mod application;
pub mod domain;
pub mod infrastructure;

// Re-export the pieces external callers need
pub use application::pipeline::{CheckSettings, run_check, run_check_with_settings};
pub use application::variants::Variant;
