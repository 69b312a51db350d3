//! Domain module - Core validation entities
//!
//! Pure data types shared by the pipeline: manifest records, page shapes,
//! discrepancies, and the auxiliary comparison table rows. No I/O here.

pub mod comparison_row;
pub mod discrepancy;
pub mod lead;
pub mod page;

// Re-export commonly used items
pub use comparison_row::ComparisonRow;
pub use discrepancy::{Discrepancy, Severity};
pub use lead::{CaseKeyParts, Lead};
pub use page::PageShape;
