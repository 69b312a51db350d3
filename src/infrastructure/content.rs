//! Content file reading.
//!
//! A content file carries one captured snapshot per line:
//! `id | effective-date | encoded-payload`. The middle field is not used
//! by validation. Header lines and blank lines are skipped. Files are
//! read fully and closed before decoding begins.

use crate::infrastructure::payload::{self, DecodeError, Nesting};
use std::collections::HashMap;
use std::path::Path;
use tracing::debug;

/// Marker prefix for the non-data first line some producers emit.
const HEADER_MARKER: &str = "HEADER ROW";

/// One undecoded line of a content file.
#[derive(Debug, Clone)]
pub struct RawRecord {
    pub id: String,
    pub payload: String,
}

/// A fully-read content file.
#[derive(Debug, Clone, Default)]
pub struct ContentFile {
    /// Every line as read, for line-count and duplicate-line checks.
    pub lines: Vec<String>,
    /// Parsed records in file order.
    pub records: Vec<RawRecord>,
}

impl ContentFile {
    pub fn load(path: &Path) -> std::io::Result<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut lines = Vec::new();
        let mut records = Vec::new();
        for line in text.lines() {
            lines.push(line.to_string());
            if line.trim().is_empty() || line.starts_with(HEADER_MARKER) {
                continue;
            }
            let parts: Vec<&str> = line.splitn(3, '|').collect();
            if parts.len() < 3 {
                debug!("skipping short content line ({} fields)", parts.len());
                continue;
            }
            records.push(RawRecord {
                id: parts[0].trim().to_string(),
                payload: parts[2].trim().to_string(),
            });
        }
        debug!(records = records.len(), "read content file");
        Ok(Self { lines, records })
    }

    /// Decode every record according to the nesting policy. When one
    /// identifier appears more than once, the last occurrence wins; the
    /// first occurrence's position keeps the reporting order stable.
    pub fn decode(&self, nesting: Nesting) -> DecodedContent {
        let mut order = Vec::new();
        let mut by_id: HashMap<String, Result<String, DecodeError>> = HashMap::new();
        for record in &self.records {
            if !by_id.contains_key(&record.id) {
                order.push(record.id.clone());
            }
            by_id.insert(record.id.clone(), payload::decode_payload(&record.payload, nesting));
        }
        DecodedContent { order, by_id }
    }
}

/// Decoded documents keyed by record identifier.
#[derive(Debug, Clone, Default)]
pub struct DecodedContent {
    order: Vec<String>,
    by_id: HashMap<String, Result<String, DecodeError>>,
}

impl DecodedContent {
    /// Exact lookup first, then case-insensitive.
    pub fn get(&self, id: &str) -> Option<&Result<String, DecodeError>> {
        if let Some(found) = self.by_id.get(id) {
            return Some(found);
        }
        self.by_id
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(id))
            .map(|(_, v)| v)
    }

    /// Identifiers in first-encounter order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.order.iter().map(String::as_str)
    }
}
