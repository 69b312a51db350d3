//! Flager rules.
//!
//! The manifest supplies a complete `CaseKey` attribute per lead. Two
//! page shapes: a case-number search confirmation (`N cases found`) that
//! echoes the search filter back, and a case detail page built from
//! accordion sections with a `dd.casenumber` element.

use super::VariantCheck;
use crate::domain::{Discrepancy, Lead, PageShape};
use crate::infrastructure::html;
use crate::infrastructure::payload::Nesting;
use once_cell::sync::Lazy;
use scraper::Selector;

const CASES_FOUND_MARKER: &str = "cases found";
const EXPECTED_SEARCH_TYPE: &str = "CaseNumber";

/// At least one of these must be present for the capture to be a real
/// detail page.
const SECTION_IDS: [&str; 4] = [
    "summaryAccordion",
    "partyAccordion",
    "chargeAccordion",
    "caseDocketsAccordion",
];

static CASE_NUMBER_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("dd.casenumber").expect("valid selector"));
static SEARCH_FILTER_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.searchFilter").expect("valid selector"));
static SEARCH_TYPE_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("div.searchTypeFilter").expect("valid selector"));

pub struct FlagerCheck;

impl FlagerCheck {
    fn classify(html_content: &str) -> PageShape {
        if html_content.to_lowercase().contains(CASES_FOUND_MARKER) {
            PageShape::Results
        } else {
            PageShape::Detail
        }
    }

    /// The `N cases found` page echoes the search filter; both the case
    /// key and the search type must match the request.
    fn validate_cases_found(lead: &Lead, html_content: &str, expected: &str) -> Vec<Discrepancy> {
        let doc = html::parse_document(html_content);
        let mut errors = Vec::new();

        let case_key = doc
            .select(&SEARCH_FILTER_SEL)
            .next()
            .map(|el| html::direct_text(&el))
            .unwrap_or_default();
        if case_key.is_empty() {
            errors.push(Discrepancy::hard(
                &lead.id,
                "case-key",
                "searchFilter block with case number not found",
            ));
            return errors;
        }
        if case_key != expected {
            errors.push(
                Discrepancy::hard(
                    &lead.id,
                    "case-number",
                    format!("Case number mismatch (manifest '{expected}', page '{case_key}')"),
                )
                .with_values(expected, case_key),
            );
            return errors;
        }

        let search_type = doc
            .select(&SEARCH_TYPE_SEL)
            .next()
            .map(|el| html::direct_text(&el))
            .unwrap_or_default();
        if search_type.is_empty() {
            errors.push(Discrepancy::hard(
                &lead.id,
                "search-type",
                "searchTypeFilter block not found",
            ));
        } else if search_type != EXPECTED_SEARCH_TYPE {
            errors.push(
                Discrepancy::hard(
                    &lead.id,
                    "search-type",
                    "Wrong search type selected",
                )
                .with_values(EXPECTED_SEARCH_TYPE, search_type),
            );
        }

        errors
    }

    fn validate_detail(lead: &Lead, html_content: &str, expected: &str) -> Vec<Discrepancy> {
        if html_content.trim().is_empty() {
            return vec![Discrepancy::hard(&lead.id, "collection", "Empty page content")];
        }
        let doc = html::parse_document(html_content);

        let any_section = SECTION_IDS.iter().any(|sid| {
            Selector::parse(&format!("div#{sid}"))
                .ok()
                .and_then(|sel| doc.select(&sel).next())
                .is_some()
        });
        if !any_section {
            return vec![Discrepancy::hard(
                &lead.id,
                "collection",
                "Collection error (expected page sections missing)",
            )];
        }

        let Some(case_number_el) = doc.select(&CASE_NUMBER_SEL).next() else {
            return vec![Discrepancy::soft(
                &lead.id,
                "loading",
                "Page still loading (case number block not rendered)",
            )];
        };
        let actual = case_number_el
            .text()
            .collect::<String>()
            .replace('\u{a0}', " ")
            .trim()
            .to_string();
        if actual != expected {
            return vec![
                Discrepancy::hard(
                    &lead.id,
                    "case-number",
                    format!("Case number mismatch (manifest '{expected}', page '{actual}')"),
                )
                .with_values(expected, actual),
            ];
        }
        Vec::new()
    }
}

impl VariantCheck for FlagerCheck {
    fn nesting(&self) -> Nesting {
        Nesting::Required
    }

    fn validate_record(
        &self,
        lead: &Lead,
        html_content: &str,
        _settings: &crate::application::pipeline::CheckSettings,
    ) -> Vec<Discrepancy> {
        let expected = lead.case_key.as_deref().unwrap_or("");
        match Self::classify(html_content) {
            PageShape::Results => Self::validate_cases_found(lead, html_content, expected),
            PageShape::Detail => Self::validate_detail(lead, html_content, expected),
            PageShape::SearchForm | PageShape::NoResults | PageShape::Loading => Vec::new(),
        }
    }
}
