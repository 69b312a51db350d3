//! Report accumulation.
//!
//! The report is a value threaded through the pipeline, not a shared
//! log. Lines are appended in encounter order (file, then record) so
//! two runs over the same batch diff cleanly. Hard discrepancies feed
//! the counts; soft lines stay visible but are not counted.

use crate::domain::{Discrepancy, discrepancy::FILE_LEVEL_ID};
use std::collections::BTreeSet;

#[derive(Debug, Default)]
pub struct ReportBuilder {
    lines: Vec<String>,
    file_hard: usize,
    file_record_ids: BTreeSet<String>,
    total_hard: usize,
    batch_record_ids: BTreeSet<String>,
}

impl ReportBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Batch intro line.
    pub fn intro(&mut self, pair_count: usize) {
        self.lines
            .push(format!("Starting check of {pair_count} file pairs...\n"));
    }

    /// Batch-level warning (unmatched file, skipped input).
    pub fn warning(&mut self, message: &str) {
        self.lines.push(format!("⚠️ {message}"));
    }

    /// Open a per-file section.
    pub fn begin_file(&mut self, base_name: &str) {
        self.lines.push(format!("\n--- Processing: {base_name} ---"));
        self.file_hard = 0;
        self.file_record_ids.clear();
    }

    /// File-level failure (unreadable manifest or content file).
    pub fn file_error(&mut self, message: &str) {
        self.lines.push(format!("  ❌ [File error]: {message}"));
        self.file_hard += 1;
        self.total_hard += 1;
    }

    /// Informational line inside a file section.
    pub fn note(&mut self, message: &str) {
        self.lines.push(format!("  {message}"));
    }

    /// Emit one discrepancy line and update the counts.
    pub fn discrepancy(&mut self, d: &Discrepancy) {
        let marker = if d.is_hard() { "❌" } else { "⚠️" };
        self.lines
            .push(format!("  {marker} ID: {} | {}", d.record_id, d.message));
        if d.is_hard() {
            self.file_hard += 1;
            self.total_hard += 1;
            if d.record_id != FILE_LEVEL_ID {
                self.file_record_ids.insert(d.record_id.clone());
                self.batch_record_ids.insert(d.record_id.clone());
            }
        }
    }

    /// Report one examined record: an explicit no-errors line, or one
    /// line per discrepancy. Every record examined appears exactly once.
    pub fn record(&mut self, id: &str, discrepancies: &[Discrepancy]) {
        if discrepancies.is_empty() {
            self.lines.push(format!("  ✅ ID: {id} | no errors found"));
            return;
        }
        for d in discrepancies {
            self.discrepancy(d);
        }
    }

    /// Close the current file section with its subtotal.
    pub fn end_file(&mut self) {
        self.lines.push(format!(
            "  📌 Total errors for file: {} (across {} records)",
            self.file_hard,
            self.file_record_ids.len()
        ));
    }

    /// Append the batch summary and render the report.
    pub fn finish(mut self) -> String {
        self.lines.push("\n--- BATCH SUMMARY ---".to_string());
        self.lines.push(summary_line("Total hard errors", self.total_hard));
        self.lines.push(summary_line(
            "Records with errors",
            self.batch_record_ids.len(),
        ));
        self.lines.join("\n")
    }

    /// Render without the batch summary (for callers that append more).
    pub fn render(&self) -> String {
        self.lines.join("\n")
    }
}

fn summary_line(label: &str, count: usize) -> String {
    let marker = if count == 0 { "✅" } else { "❌" };
    format!("{marker} {label}: {count}")
}
