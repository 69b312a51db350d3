//! MD (new layout) rules.
//!
//! Validates the search request echo on both page shapes: names and the
//! filing date range, compared as dates rather than strings. The case
//! type is inferred from the manifest file name for operator context.

use super::VariantCheck;
use super::md;
use crate::application::pipeline::{CheckSettings, FilePair};
use crate::application::rules;
use crate::domain::{CaseKeyParts, Discrepancy, Lead, PageShape};
use crate::infrastructure::html;
use crate::infrastructure::payload::Nesting;
use tracing::info;

const DEFAULT_CASE_TYPE: &str = "ALLCASETYPES";

pub struct MdNewCheck;

/// Case type encoded in the manifest file name: the token before
/// `NameSearch`, a literal `CASENUMBERFILE`, the third token of the
/// `MDSWJD` naming scheme, or an `ALLCASETYPES`-style token.
pub(crate) fn infer_case_type(file_name: &str) -> Option<String> {
    let stem = std::path::Path::new(file_name)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(file_name);
    let tokens: Vec<&str> = stem
        .split(['_', '-'])
        .filter(|t| !t.is_empty())
        .collect();

    if let Some(idx) = tokens.iter().position(|t| *t == "NameSearch") {
        if idx > 0 {
            return Some(tokens[idx - 1].to_string());
        }
    }
    if tokens.iter().any(|t| t.eq_ignore_ascii_case("CASENUMBERFILE")) {
        return Some("CASENUMBERFILE".to_string());
    }
    if tokens
        .first()
        .is_some_and(|t| t.to_uppercase().starts_with("MDSWJD"))
        && tokens.len() >= 3
    {
        return Some(tokens[2].to_string());
    }
    for token in &tokens {
        let upper = token.to_uppercase();
        if matches!(upper.as_str(), "ALLCASETYPES" | "ALLCASETYPE" | "ALLCASES" | "ALLCASE") {
            return Some(DEFAULT_CASE_TYPE.to_string());
        }
        if upper.contains("CASETYPE") {
            return Some((*token).to_string());
        }
    }
    None
}

impl MdNewCheck {
    fn check_filing_range_form(
        lead: &Lead,
        parts: &CaseKeyParts,
        html_content: &str,
    ) -> Vec<Discrepancy> {
        let start = html::input_value(html_content, "filingStart");
        let end = html::input_value(html_content, "filingEnd");
        let expected_from = rules::parse_mdy(&parts.date_from);
        let expected_to = rules::parse_mdy(&parts.date_to);

        let (Some(expected_from), Some(expected_to)) = (expected_from, expected_to) else {
            return vec![Discrepancy::hard(
                &lead.id,
                "filing-range",
                "Filing date range has invalid format",
            )];
        };

        let mut errors = Vec::new();
        if start.as_deref().and_then(rules::parse_mdy) != Some(expected_from) {
            errors.push(
                Discrepancy::hard(&lead.id, "range-from", "Filing range start does not match")
                    .with_values(&parts.date_from, start.unwrap_or_default()),
            );
        }
        if end.as_deref().and_then(rules::parse_mdy) != Some(expected_to) {
            errors.push(
                Discrepancy::hard(&lead.id, "range-to", "Filing range end does not match")
                    .with_values(&parts.date_to, end.unwrap_or_default()),
            );
        }
        errors
    }

    fn check_filing_range_results(
        lead: &Lead,
        parts: &CaseKeyParts,
        html_content: &str,
    ) -> Vec<Discrepancy> {
        let Some(range) = html::labeled_span(html_content, "Filing Date Range") else {
            return vec![Discrepancy::hard(
                &lead.id,
                "filing-range",
                "Filing date range not found in page",
            )];
        };
        let Some((start_str, end_str)) = range.split_once("to") else {
            return vec![
                Discrepancy::hard(&lead.id, "filing-range", "Filing date range has invalid format")
                    .with_values(
                        format!("{} to {}", parts.date_from, parts.date_to),
                        range,
                    ),
            ];
        };
        let parsed = (
            rules::parse_mdy(start_str.trim()),
            rules::parse_mdy(end_str.trim()),
            rules::parse_mdy(&parts.date_from),
            rules::parse_mdy(&parts.date_to),
        );
        match parsed {
            (Some(start), Some(end), Some(expected_from), Some(expected_to)) => {
                if start != expected_from || end != expected_to {
                    vec![
                        Discrepancy::hard(
                            &lead.id,
                            "filing-range",
                            "Filing date range does not match search request",
                        )
                        .with_values(
                            format!("{} to {}", parts.date_from, parts.date_to),
                            range,
                        ),
                    ]
                } else {
                    Vec::new()
                }
            }
            _ => vec![Discrepancy::hard(
                &lead.id,
                "filing-range",
                "Filing date range has invalid format",
            )],
        }
    }
}

impl VariantCheck for MdNewCheck {
    fn nesting(&self) -> Nesting {
        Nesting::Required
    }

    fn file_checks(
        &self,
        pair: &FilePair,
        _content: &crate::infrastructure::content::ContentFile,
        _settings: &CheckSettings,
    ) -> Vec<Discrepancy> {
        let manifest_name = pair
            .manifest_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or(&pair.base_name);
        match infer_case_type(manifest_name) {
            Some(case_type) => {
                info!(case_type, "inferred case type from manifest file name");
                Vec::new()
            }
            None => vec![Discrepancy::soft(
                crate::domain::discrepancy::FILE_LEVEL_ID,
                "case-type",
                format!(
                    "Could not infer case type from file name; defaulting to {DEFAULT_CASE_TYPE}"
                ),
            )],
        }
    }

    fn validate_record(
        &self,
        lead: &Lead,
        html_content: &str,
        _settings: &CheckSettings,
    ) -> Vec<Discrepancy> {
        let Some(parts) = lead.case_key_parts() else {
            return Vec::new();
        };
        let shape = md::classify(html_content);
        let mut errors = md::MdCheck::check_names(lead, &parts, html_content, shape);
        match shape {
            PageShape::SearchForm => {
                errors.extend(Self::check_filing_range_form(lead, &parts, html_content));
            }
            _ => {
                errors.extend(Self::check_filing_range_results(lead, &parts, html_content));
            }
        }
        errors
    }
}
