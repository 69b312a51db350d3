//! Discrepancy values produced by the comparison path.
//!
//! A discrepancy is pure output: it is appended to the report and never
//! stored. Hard discrepancies are mismatches; soft ones are advisory
//! states (page still loading, detail row never expanded) that stay in
//! the report but are excluded from hard-error counts.

use serde::{Deserialize, Serialize};

/// Identifier used for discrepancies not attributable to a single record.
pub const FILE_LEVEL_ID: &str = "N/A";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    /// A mismatch between expected and actual values, or a structural
    /// failure (missing document, undecodable payload).
    Hard,
    /// Advisory only: the page was captured in a transitional state.
    Soft,
}

/// One reported mismatch between expected and actual values for a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Discrepancy {
    /// Record identifier, or [`FILE_LEVEL_ID`] for file-level findings.
    pub record_id: String,
    /// Short field name the check applies to (`case-number`, `date`, ...).
    pub field: String,
    pub expected: Option<String>,
    pub actual: Option<String>,
    pub severity: Severity,
    /// Human-readable reason, rendered verbatim into the report line.
    pub message: String,
}

impl Discrepancy {
    pub fn hard(record_id: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            record_id: record_id.to_string(),
            field: field.to_string(),
            expected: None,
            actual: None,
            severity: Severity::Hard,
            message: message.into(),
        }
    }

    pub fn soft(record_id: &str, field: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Soft,
            ..Self::hard(record_id, field, message)
        }
    }

    /// A finding that belongs to the file pair rather than one record.
    pub fn file_level(field: &str, message: impl Into<String>) -> Self {
        Self::hard(FILE_LEVEL_ID, field, message)
    }

    /// Attach the expected/actual pair that failed the comparison.
    #[must_use]
    pub fn with_values(mut self, expected: impl Into<String>, actual: impl Into<String>) -> Self {
        self.expected = Some(expected.into());
        self.actual = Some(actual.into());
        self
    }

    pub fn is_hard(&self) -> bool {
        self.severity == Severity::Hard
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn soft_discrepancies_are_not_hard() {
        let d = Discrepancy::soft("a1", "loading", "Results page still loading");
        assert!(!d.is_hard());
        assert_eq!(d.record_id, "a1");
    }

    #[test]
    fn file_level_uses_placeholder_id() {
        let d = Discrepancy::file_level("line-count", "Line count mismatch");
        assert_eq!(d.record_id, FILE_LEVEL_ID);
        assert!(d.is_hard());
    }

    #[test]
    fn with_values_records_both_sides() {
        let d = Discrepancy::hard("a1", "name", "Name mismatch").with_values("SMITH", "JONES");
        assert_eq!(d.expected.as_deref(), Some("SMITH"));
        assert_eq!(d.actual.as_deref(), Some("JONES"));
    }
}
