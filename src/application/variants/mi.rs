//! MI rules.
//!
//! This variant does not compare a single page per record: each payload's
//! outer envelope lists the search URLs issued for the record, one per
//! result page. Those URLs are materialized into the comparison table
//! (written as CSV next to the content file), and the completeness
//! checks then run over the whole table: name and date-range echoes,
//! duplicate pages, required query flags, and pagination completeness
//! against the nested result page's own record count.

use super::VariantCheck;
use crate::application::checks;
use crate::application::pipeline::{CheckSettings, FilePair};
use crate::application::report::ReportBuilder;
use crate::application::rules;
use crate::domain::{ComparisonRow, Discrepancy, Lead};
use crate::infrastructure::content::ContentFile;
use crate::infrastructure::html;
use crate::infrastructure::manifest::Manifest;
use crate::infrastructure::payload::Nesting;
use crate::infrastructure::table;
use std::collections::BTreeMap;
use tracing::debug;

const TABLE_SUFFIX: &str = "_compare_output.csv";

pub struct MiCheck;

impl MiCheck {
    /// One table row per URL listed in the record's outer envelope.
    fn build_rows(
        manifest: &Manifest,
        manifest_file: &str,
        content: &ContentFile,
    ) -> Vec<ComparisonRow> {
        let mut rows = Vec::new();
        for record in &content.records {
            let decoded = match crate::infrastructure::payload::decode_payload(
                &record.payload,
                Nesting::None,
            ) {
                Ok(text) => text,
                Err(e) => {
                    debug!(id = %record.id, error = %e, "skipping undecodable record");
                    continue;
                }
            };

            let lead = manifest.lead_by_id(&record.id);
            let last_xml = lead
                .map(|l| l.field(1).trim().to_uppercase())
                .unwrap_or_default();
            let date_xml = lead
                .map(|l| rules::normalize_date_range(l.field(2)))
                .unwrap_or_default();

            let uris = html::uri_blocks(&decoded);
            let (last_txt, date_txt) = match uris.first() {
                Some(first) => (
                    html::query_param(first, "lastName")
                        .map(|v| v.to_uppercase())
                        .unwrap_or_default(),
                    rules::date_range_from_url(first).unwrap_or_default(),
                ),
                None => (String::new(), String::new()),
            };

            for (ordinal, url) in uris.iter().enumerate() {
                let page = html::page_number(url)
                    .map_or_else(|| (ordinal + 1).to_string(), |p| p.to_string());
                rows.push(ComparisonRow {
                    file_xml: manifest_file.to_string(),
                    id: record.id.clone(),
                    last_name_xml: if last_xml.is_empty() {
                        last_txt.clone()
                    } else {
                        last_xml.clone()
                    },
                    last_name_txt: last_txt.clone(),
                    check_name: last_xml == last_txt,
                    date_xml: date_xml.clone(),
                    date_txt: date_txt.clone(),
                    check_date: date_xml == date_txt,
                    page,
                    url: url.clone(),
                });
            }
        }
        rows
    }
}

impl VariantCheck for MiCheck {
    fn nesting(&self) -> Nesting {
        Nesting::None
    }

    fn validate_record(
        &self,
        _lead: &Lead,
        _html: &str,
        _settings: &CheckSettings,
    ) -> Vec<Discrepancy> {
        // All validation happens over the comparison table in check_pair.
        Vec::new()
    }

    fn check_pair(&self, pair: &FilePair, settings: &CheckSettings, report: &mut ReportBuilder) {
        report.begin_file(&pair.base_name);

        let manifest = match Manifest::load(&pair.manifest_path) {
            Ok(manifest) => manifest,
            Err(e) => {
                report.file_error(&format!("Could not read manifest: {e}"));
                report.end_file();
                return;
            }
        };
        let content = match ContentFile::load(&pair.content_path) {
            Ok(content) => content,
            Err(e) => {
                report.file_error(&format!("Could not read content file: {e}"));
                report.end_file();
                return;
            }
        };

        let manifest_file = pair
            .manifest_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&pair.base_name)
            .to_string();
        let rows = Self::build_rows(&manifest, &manifest_file, &content);

        let table_path = pair
            .content_path
            .with_file_name(format!("{}{TABLE_SUFFIX}", pair.base_name));
        match table::write_comparison_table(&table_path, &rows) {
            Ok(()) => {
                let name = table_path
                    .file_name()
                    .and_then(|n| n.to_str())
                    .unwrap_or(TABLE_SUFFIX)
                    .to_string();
                report.note(&format!("✅ Created file {name}"));
            }
            Err(e) => {
                report.file_error(&format!("Failed to write comparison table: {e}"));
                report.end_file();
                return;
            }
        }

        // Nested result pages carry the total-record indicator used by
        // the pagination check.
        let nested = content.decode(Nesting::Required);
        let mut discrepancies = Vec::new();
        discrepancies.extend(checks::check_names(&rows));
        discrepancies.extend(checks::check_dates(&rows));
        discrepancies.extend(checks::check_duplicates(&rows));
        discrepancies.extend(checks::check_required_flags(&rows));
        discrepancies.extend(checks::check_pagination(
            &rows,
            |id| nested.get(id).and_then(|r| r.as_deref().ok()),
            settings.results_page_size,
        ));

        let mut by_record: BTreeMap<String, Vec<Discrepancy>> = BTreeMap::new();
        for d in discrepancies {
            by_record.entry(d.record_id.clone()).or_default().push(d);
        }

        // Report in manifest order, then any content-only identifiers.
        for lead in &manifest.leads {
            let found = by_record.remove(&lead.id).unwrap_or_default();
            report.record(&lead.id, &found);
        }
        for id in nested.ids() {
            if manifest.lead_by_id(id).is_none() {
                let mut found = by_record.remove(id).unwrap_or_default();
                found.push(Discrepancy::hard(id, "manifest", "Record not present in manifest"));
                report.record(id, &found);
            }
        }
        for (id, found) in by_record {
            report.record(&id, &found);
        }

        report.end_file();
    }
}
