//! MD rules.
//!
//! Strictly nested payloads. A `DATA NOT FOUND` capture is the search
//! form echoing the request back (`caseId` input); anything else is a
//! result page with a labeled `Case Number:` value. When the CaseKey
//! carries the date-range/name structure, the name fields are validated
//! as well.

use super::VariantCheck;
use crate::domain::{CaseKeyParts, Discrepancy, Lead, PageShape};
use crate::infrastructure::html;
use crate::infrastructure::payload::Nesting;
use once_cell::sync::Lazy;
use regex::Regex;

pub(crate) const DATA_NOT_FOUND_MARKER: &str = "DATA NOT FOUND";

/// `Case Number:` label followed by the value span on result pages.
static CASE_NUMBER_VALUE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?is)Case Number:\s*</span>\s*</td>\s*<td>\s*<span[^>]*class="Value"[^>]*>([A-Za-z0-9.\-]+?)</span>"#,
    )
    .expect("valid case number value pattern")
});

pub struct MdCheck;

pub(crate) fn classify(html_content: &str) -> PageShape {
    if html_content.to_uppercase().contains(DATA_NOT_FOUND_MARKER) {
        PageShape::SearchForm
    } else {
        PageShape::Results
    }
}

impl MdCheck {
    /// Case-key vs. the page's case number, dashes stripped on the page
    /// side the way the site renders them.
    fn check_case_key(lead: &Lead, html_content: &str, shape: PageShape) -> Vec<Discrepancy> {
        let Some(case_key) = lead.case_key.as_deref() else {
            return Vec::new();
        };
        let expected = case_key.to_uppercase();

        match shape {
            PageShape::SearchForm => {
                let Some(value) = html::input_value(html_content, "caseId") else {
                    return Vec::new();
                };
                let actual = value.to_uppercase().replace('-', "");
                if expected != actual {
                    return vec![
                        Discrepancy::hard(
                            &lead.id,
                            "case-key",
                            format!(
                                "CaseKey mismatch (manifest '{case_key}', page '{}')",
                                value.to_uppercase()
                            ),
                        )
                        .with_values(&expected, actual),
                    ];
                }
                Vec::new()
            }
            _ => match CASE_NUMBER_VALUE_RE.captures(html_content) {
                Some(caps) => {
                    let displayed = caps[1].trim().to_uppercase();
                    let actual = displayed.replace('-', "");
                    if expected != actual {
                        vec![
                            Discrepancy::hard(
                                &lead.id,
                                "case-key",
                                format!(
                                    "CaseKey mismatch (manifest '{case_key}', page '{displayed}')"
                                ),
                            )
                            .with_values(&expected, actual),
                        ]
                    } else {
                        Vec::new()
                    }
                }
                None => vec![Discrepancy::hard(
                    &lead.id,
                    "case-number",
                    "Case number not found in page",
                )],
            },
        }
    }

    /// Name checks for structured CaseKeys: the page echoes the search
    /// names (with their `%` wildcards) either as form inputs or as
    /// labeled spans.
    pub(crate) fn check_names(
        lead: &Lead,
        parts: &CaseKeyParts,
        html_content: &str,
        shape: PageShape,
    ) -> Vec<Discrepancy> {
        let (first_actual, last_actual) = match shape {
            PageShape::SearchForm => (
                html::input_value(html_content, "firstName"),
                html::input_value(html_content, "lastName"),
            ),
            _ => (
                html::labeled_span(html_content, "First Name"),
                html::labeled_span(html_content, "Last Name"),
            ),
        };

        let mut errors = Vec::new();
        if first_actual.as_deref() != Some(parts.first_name.as_str()) {
            errors.push(
                Discrepancy::hard(&lead.id, "first-name", "First name does not match search request")
                    .with_values(&parts.first_name, first_actual.unwrap_or_default()),
            );
        }
        if last_actual.as_deref() != Some(parts.last_name.as_str()) {
            errors.push(
                Discrepancy::hard(&lead.id, "last-name", "Last name does not match search request")
                    .with_values(&parts.last_name, last_actual.unwrap_or_default()),
            );
        }
        errors
    }
}

impl VariantCheck for MdCheck {
    fn nesting(&self) -> Nesting {
        Nesting::Required
    }

    fn validate_record(
        &self,
        lead: &Lead,
        html_content: &str,
        _settings: &crate::application::pipeline::CheckSettings,
    ) -> Vec<Discrepancy> {
        if lead.case_key.is_none() {
            return Vec::new();
        }
        let shape = classify(html_content);
        let mut errors = Self::check_case_key(lead, html_content, shape);
        if let Some(parts) = lead.case_key_parts() {
            errors.extend(Self::check_names(lead, &parts, html_content, shape));
        }
        errors
    }
}
