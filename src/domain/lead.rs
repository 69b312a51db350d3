//! Manifest lead records.
//!
//! A `Lead` is one search-request unit from the XML manifest: an `ID`,
//! optionally a composite `CaseKey` attribute, and indexed `InputValue`
//! fields. Which fields carry which meaning depends on the tool variant.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Composite CaseKey layout: `MM/DD/YYYY-MM/DD/YYYY LASTNAME%,FIRSTNAME%`.
static CASE_KEY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"([\d/\-]{10})-([\d/\-]{10}) (.*?)%,(.*?)%").expect("valid case key pattern")
});

/// One record from a lead manifest. Immutable after load.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lead {
    /// Unique identifier within one manifest.
    pub id: String,
    /// Composite expected-value string, when the manifest uses the
    /// attribute layout instead of indexed fields.
    pub case_key: Option<String>,
    /// `FieldID` index to expected value. Ordered so reports are stable.
    pub fields: BTreeMap<u8, String>,
}

impl Lead {
    /// Expected value for a field index, empty when absent.
    pub fn field(&self, field_id: u8) -> &str {
        self.fields.get(&field_id).map_or("", String::as_str)
    }

    /// Parse the fixed-structure CaseKey into its components. Malformed
    /// keys yield `None`; the record's key checks are then skipped.
    pub fn case_key_parts(&self) -> Option<CaseKeyParts> {
        CaseKeyParts::parse(self.case_key.as_deref()?)
    }
}

/// Decomposed CaseKey. The name components keep their trailing `%`
/// wildcard because the rendered pages echo it back verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaseKeyParts {
    pub date_from: String,
    pub date_to: String,
    pub last_name: String,
    pub first_name: String,
}

impl CaseKeyParts {
    pub fn parse(case_key: &str) -> Option<Self> {
        let caps = CASE_KEY_RE.captures(case_key)?;
        Some(Self {
            date_from: caps[1].trim().to_string(),
            date_to: caps[2].trim().to_string(),
            last_name: format!("{}%", caps[3].trim()),
            first_name: format!("{}%", caps[4].trim()),
        })
    }
}
