//! Auxiliary comparison table rows.

use serde::{Deserialize, Serialize};

/// One row per (record, URL variant) in the intermediate comparison
/// table: expected vs. actual name and date range, plus the page number
/// the URL addresses. Downstream completeness checks (duplicates,
/// pagination) operate on the whole table rather than record by record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonRow {
    /// Manifest file name the row was built from.
    pub file_xml: String,
    /// Record identifier.
    pub id: String,
    pub last_name_xml: String,
    pub last_name_txt: String,
    pub check_name: bool,
    pub date_xml: String,
    pub date_txt: String,
    pub check_date: bool,
    /// Page number as displayed in the URL, or the URL's ordinal when
    /// the URL carries no page parameter.
    pub page: String,
    pub url: String,
}
