//! Civitek (legacy layout) rules.
//!
//! Detail pages from this producer carry an expand-all button, nested
//! charge rows behind toggle icons, and lazily loaded list sections.
//! The manifest supplies a county name in field 1 and a composite case
//! number split across fields 2..=6.

use super::VariantCheck;
use crate::application::pipeline::{CheckSettings, FilePair};
use crate::domain::{Discrepancy, Lead, PageShape};
use crate::infrastructure::html;
use crate::infrastructure::payload::Nesting;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::Selector;
use std::collections::{BTreeSet, HashSet};

const NO_MATCHES_MARKER: &str = "No matches found";

/// List sections that load after the first paint, keyed by the column
/// title that only appears once the section has data.
const LOADING_SECTIONS: [(&str, &str); 5] = [
    ("Doc #", "Dockets"),
    ("Judicial Officer", "Judge Assignment History"),
    ("Defendant Attorney", "Court Events"),
    ("Assessment Due", "Financial Summary"),
    ("Reopen Reason", "Reopen History"),
];

static STATUTE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)Statute\s*/\s*Text").expect("valid statute pattern"));
static CLOSED_TOGGLE_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div[id*='chargeDetailsTable'] .ui-icon-circle-triangle-e")
        .expect("valid selector")
});
static OPENED_TOGGLE_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse("div[id*='chargeDetailsTable'] .ui-icon-circle-triangle-s")
        .expect("valid selector")
});
static COLUMN_TITLE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("span.ui-column-title").expect("valid selector"));

pub struct CivitekCheck;

impl CivitekCheck {
    fn classify(html_content: &str) -> PageShape {
        if html_content.trim().is_empty() {
            return PageShape::Loading;
        }
        if html_content.contains(NO_MATCHES_MARKER) {
            return PageShape::NoResults;
        }
        PageShape::Detail
    }

    /// Structural completeness of the detail page: expand-all state,
    /// charge row toggles, lazily loaded sections.
    fn structural_checks(lead: &Lead, html_content: &str) -> Vec<Discrepancy> {
        let mut errors = Vec::new();
        let doc = html::parse_document(html_content);

        if let Some(button) = html::element_with_id_containing(&doc, "form:expand") {
            let label = button.text().collect::<String>().trim().to_lowercase();
            if label.contains("expand all") {
                errors.push(Discrepancy::hard(
                    &lead.id,
                    "expand",
                    "'Expand All' button is still collapsed",
                ));
            }
        }

        let statute_rows = STATUTE_RE.find_iter(html_content).count();
        let closed = doc.select(&CLOSED_TOGGLE_SEL).count();
        let opened = doc.select(&OPENED_TOGGLE_SEL).count();
        let total_toggles = closed + opened;
        if total_toggles > 0 && statute_rows != total_toggles {
            errors.push(Discrepancy::hard(
                &lead.id,
                "expand-rows",
                format!("{total_toggles} expandable rows, {statute_rows} currently open"),
            ));
        }

        let labels: HashSet<String> = doc
            .select(&COLUMN_TITLE_SEL)
            .map(|el| el.text().collect::<String>().trim().to_lowercase())
            .collect();
        for (column_title, section) in LOADING_SECTIONS {
            if !labels.contains(&column_title.to_lowercase()) {
                errors.push(Discrepancy::soft(
                    &lead.id,
                    "loading",
                    format!("Section {section} still loading"),
                ));
            }
        }

        errors
    }

    /// Manifest-vs-page field checks: county in the title, the composite
    /// case number, and a presence scan for the individual fields.
    fn field_checks(lead: &Lead, html_content: &str) -> Vec<Discrepancy> {
        let mut errors = Vec::new();
        let doc = html::parse_document(html_content);

        let county = lead.field(1).to_lowercase();
        if !county.is_empty() {
            let title = html::title_text(&doc).unwrap_or_default().to_lowercase();
            if !title.contains(&county) {
                errors.push(
                    Discrepancy::hard(
                        &lead.id,
                        "county",
                        format!("County name '{}' not found in page title", lead.field(1)),
                    )
                    .with_values(lead.field(1), title),
                );
            }
        }

        let expected: String = (2..=6).map(|i| lead.field(i).trim().to_uppercase()).collect();
        match html::case_number_block(html_content) {
            None => {
                errors.push(Discrepancy::hard(
                    &lead.id,
                    "case-number",
                    "Case number not found in page",
                ));
            }
            Some((_, no_prefix)) => {
                let actual = html::strip_non_alnum_upper(&no_prefix);
                if expected != actual {
                    errors.push(
                        Discrepancy::hard(
                            &lead.id,
                            "case-number",
                            format!(
                                "Case number mismatch: manifest '{expected}' vs page '{actual}' (county prefix stripped)"
                            ),
                        )
                        .with_values(&expected, &actual),
                    );
                }
            }
        }

        let values = html::attr_value_set(html_content);
        let composite_present =
            !expected.is_empty() && values.iter().any(|v| v.contains(&expected));
        if !composite_present {
            for i in 2..=6 {
                let field_value = lead.field(i).trim().to_string();
                if field_value.is_empty() {
                    continue;
                }
                if !values.contains(&field_value) && !html_content.contains(&field_value) {
                    errors.push(Discrepancy::hard(
                        &lead.id,
                        "field",
                        format!("FieldID {i} = '{field_value}' not found in page"),
                    ));
                }
            }
        }

        errors
    }

    /// Full-line duplicates, flagged once per record identifier.
    fn duplicate_lines(lines: &[String]) -> Vec<String> {
        let mut seen: HashSet<&str> = HashSet::new();
        let mut duplicate_ids: BTreeSet<String> = BTreeSet::new();
        for line in lines {
            if line.trim().is_empty() || line.starts_with("HEADER ROW") {
                continue;
            }
            if !seen.insert(line) {
                if let Some(id) = line.split('|').next() {
                    let id = id.trim();
                    if !id.is_empty() {
                        duplicate_ids.insert(id.to_string());
                    }
                }
            }
        }
        duplicate_ids.into_iter().collect()
    }
}

impl VariantCheck for CivitekCheck {
    fn nesting(&self) -> Nesting {
        Nesting::Optional
    }

    fn file_checks(
        &self,
        _pair: &FilePair,
        content: &crate::infrastructure::content::ContentFile,
        settings: &CheckSettings,
    ) -> Vec<Discrepancy> {
        let mut errors = Vec::new();
        if content.lines.len() != settings.expected_line_count {
            errors.push(Discrepancy::file_level(
                "line-count",
                format!(
                    "Line count mismatch (expected {}, found {})",
                    settings.expected_line_count,
                    content.lines.len()
                ),
            ));
        }
        for id in Self::duplicate_lines(&content.lines) {
            errors.push(Discrepancy::hard(&id, "duplicate", "Duplicate line (repeated record)"));
        }
        errors
    }

    fn validate_record(
        &self,
        lead: &Lead,
        html_content: &str,
        _settings: &CheckSettings,
    ) -> Vec<Discrepancy> {
        match Self::classify(html_content) {
            PageShape::Loading => vec![Discrepancy::hard(
                &lead.id,
                "collection",
                "Collection error (page did not load)",
            )],
            PageShape::NoResults => Vec::new(),
            PageShape::Detail | PageShape::Results | PageShape::SearchForm => {
                let mut errors = Self::structural_checks(lead, html_content);
                errors.extend(Self::field_checks(lead, html_content));
                errors
            }
        }
    }
}
