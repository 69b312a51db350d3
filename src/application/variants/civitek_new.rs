//! Civitek (current layout) rules.
//!
//! Two page shapes: the search form (expected values echo back as input
//! values) and the party results page (values rendered into a result
//! table with expandable detail rows). Manifest fields: 1 = county,
//! 2 = last name, 3 = first name, 4 = date from, 5 = date to,
//! 6 = court type code.

use super::VariantCheck;
use crate::application::rules;
use crate::domain::{Discrepancy, Lead, PageShape};
use crate::infrastructure::html;
use crate::infrastructure::payload::Nesting;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};

const RESULTS_LOADED_MARKER: &str = "Charge Seq#";

static LAST_NAME_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r"#form\:search_tab\:lastname").expect("valid selector"));
static FIRST_NAME_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r"#form\:search_tab\:fname").expect("valid selector"));
static DATE_FROM_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r"#form\:search_tab\:fromDate_input").expect("valid selector"));
static DATE_TO_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r"#form\:search_tab\:toDate_input").expect("valid selector"));
static SELECTED_OPTION_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("option[selected]").expect("valid selector"));
static PERSON_ROW_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(r"tbody#searchPartyResults\:partySearchResultsTable_data > tr.ui-widget-content")
        .expect("valid selector")
});
static GRID_CELL_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("td[role='gridcell']").expect("valid selector"));
static CHECKBOX_SEL: Lazy<Selector> = Lazy::new(|| {
    Selector::parse(
        r#"div#searchPartyResults\:partySearchResultsTable input[name='searchPartyResults:partySearchResultsTable_checkbox']"#,
    )
    .expect("valid selector")
});
static DETAILS_ROW_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("tr.ui-expanded-row-content").expect("valid selector"));
static TD_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("td").expect("valid selector"));
static UCN_LINK_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a.ui-link").expect("valid selector"));

static FILED_DATE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{1,2}/\d{1,2}/\d{4}$").expect("valid filed date pattern"));

pub struct CivitekNewCheck;

impl CivitekNewCheck {
    fn classify(doc: &Html, text: &str) -> PageShape {
        if doc.select(&LAST_NAME_SEL).next().is_some() {
            return PageShape::SearchForm;
        }
        if !text.contains(RESULTS_LOADED_MARKER) {
            return PageShape::Loading;
        }
        PageShape::Results
    }

    fn check_county(lead: &Lead, doc: &Html) -> Vec<Discrepancy> {
        let county = lead.field(1);
        if county.is_empty() {
            return Vec::new();
        }
        let title = html::title_text(doc).unwrap_or_else(|| "(no title)".to_string());
        if rules::contains_normalized(&title, county) {
            Vec::new()
        } else {
            vec![
                Discrepancy::hard(
                    &lead.id,
                    "county",
                    format!("County name mismatch (manifest '{county}', title '{title}')"),
                )
                .with_values(county, title.clone()),
            ]
        }
    }

    fn check_form_value(
        lead: &Lead,
        doc: &Html,
        field_id: u8,
        label: &str,
        selector: &Selector,
        is_date: bool,
    ) -> Option<Discrepancy> {
        let expected = lead.field(field_id);
        let Some(actual) = html::select_value_attr(doc, selector) else {
            return Some(Discrepancy::hard(
                &lead.id,
                label,
                format!("{label} element not found (manifest '{expected}')"),
            ));
        };
        let matches = if is_date {
            rules::normalize_date(expected) == rules::normalize_date(&actual)
        } else {
            expected == actual
        };
        if matches {
            None
        } else {
            Some(
                Discrepancy::hard(
                    &lead.id,
                    label,
                    format!("{label} mismatch (manifest '{expected}', page '{actual}')"),
                )
                .with_values(expected, actual),
            )
        }
    }

    fn validate_search_form(lead: &Lead, doc: &Html) -> Vec<Discrepancy> {
        let mut errors = Self::check_county(lead, doc);

        let field_table: [(u8, &str, &Selector, bool); 4] = [
            (2, "last-name", &LAST_NAME_SEL, false),
            (3, "first-name", &FIRST_NAME_SEL, false),
            (4, "date-from", &DATE_FROM_SEL, true),
            (5, "date-to", &DATE_TO_SEL, true),
        ];
        for (field_id, label, selector, is_date) in field_table {
            if let Some(d) = Self::check_form_value(lead, doc, field_id, label, selector, is_date) {
                errors.push(d);
            }
        }

        let expected_court = lead.field(6);
        let selected: Vec<_> = doc.select(&SELECTED_OPTION_SEL).collect();
        if selected.len() != 1 {
            errors.push(Discrepancy::hard(
                &lead.id,
                "court-type",
                format!(
                    "Court type: expected one selected option, found {} (manifest '{expected_court}')",
                    selected.len()
                ),
            ));
        } else {
            let actual = selected[0].value().attr("value").unwrap_or_default();
            if actual != expected_court {
                errors.push(
                    Discrepancy::hard(
                        &lead.id,
                        "court-type",
                        format!("Court type mismatch (manifest '{expected_court}', page '{actual}')"),
                    )
                    .with_values(expected_court, actual),
                );
            }
        }

        errors
    }

    fn validate_results(lead: &Lead, doc: &Html) -> Vec<Discrepancy> {
        let mut errors = Self::check_county(lead, doc);

        let last_name = lead.field(2).to_uppercase();
        let first_name = lead.field(3).to_uppercase();
        let target_row = doc.select(&PERSON_ROW_SEL).find(|row| {
            let cells: Vec<_> = row.select(&GRID_CELL_SEL).collect();
            cells.get(2).is_some_and(|cell| {
                let name = cell.text().collect::<String>().to_uppercase();
                name.contains(&last_name) && name.contains(&first_name)
            })
        });
        let Some(_target_row) = target_row else {
            errors.push(Discrepancy::hard(
                &lead.id,
                "name",
                format!("No result row matching '{first_name} {last_name}'"),
            ));
            return errors;
        };

        let any_unchecked = doc.select(&CHECKBOX_SEL).any(|input| {
            input.value().attr("aria-label") != Some("Select All")
                && input.value().attr("checked").is_none()
        });
        if any_unchecked {
            errors.push(Discrepancy::hard(
                &lead.id,
                "checkbox",
                "Result checkbox not selected",
            ));
        }

        let Some(details_row) = doc.select(&DETAILS_ROW_SEL).next() else {
            errors.push(Discrepancy::soft(
                &lead.id,
                "details",
                "Matching row found but detail section not expanded",
            ));
            return errors;
        };

        let filed_date = details_row
            .select(&TD_SEL)
            .map(|td| td.text().collect::<String>().trim().to_string())
            .find(|text| FILED_DATE_RE.is_match(text));
        match filed_date {
            None => errors.push(Discrepancy::hard(
                &lead.id,
                "date",
                "Filed date not found in detail section",
            )),
            Some(filed) => {
                let parsed = (
                    rules::parse_mdy(lead.field(4)),
                    rules::parse_mdy(lead.field(5)),
                    rules::parse_mdy(&filed),
                );
                match parsed {
                    (Some(from), Some(to), Some(date)) => {
                        if !rules::date_within(date, from, to) {
                            errors.push(
                                Discrepancy::hard(
                                    &lead.id,
                                    "date",
                                    format!(
                                        "Filed date outside range (manifest '{}' - '{}', page '{filed}')",
                                        lead.field(4),
                                        lead.field(5)
                                    ),
                                )
                                .with_values(
                                    format!("{} - {}", lead.field(4), lead.field(5)),
                                    filed,
                                ),
                            );
                        }
                    }
                    _ => errors.push(Discrepancy::hard(
                        &lead.id,
                        "date",
                        "Invalid date format in manifest or page",
                    )),
                }
            }
        }

        let expected_court = lead.field(6);
        match details_row.select(&UCN_LINK_SEL).next() {
            None => errors.push(Discrepancy::hard(
                &lead.id,
                "court-type",
                "UCN link not found in detail section",
            )),
            Some(link) => {
                let ucn = link.text().collect::<String>();
                let actual = rules::court_code(&ucn)
                    .unwrap_or_else(|| "(could not extract)".to_string());
                if actual != expected_court {
                    errors.push(
                        Discrepancy::hard(
                            &lead.id,
                            "court-type",
                            format!(
                                "Court type mismatch (manifest '{expected_court}', from UCN '{actual}')"
                            ),
                        )
                        .with_values(expected_court, actual),
                    );
                }
            }
        }

        errors
    }
}

impl VariantCheck for CivitekNewCheck {
    fn nesting(&self) -> Nesting {
        Nesting::Optional
    }

    fn validate_record(
        &self,
        lead: &Lead,
        html_content: &str,
        _settings: &crate::application::pipeline::CheckSettings,
    ) -> Vec<Discrepancy> {
        let doc = html::parse_document(html_content);
        match Self::classify(&doc, html_content) {
            PageShape::SearchForm => Self::validate_search_form(lead, &doc),
            PageShape::Loading => {
                let mut errors = Self::check_county(lead, &doc);
                errors.push(Discrepancy::soft(
                    &lead.id,
                    "loading",
                    "Results page still loading",
                ));
                errors
            }
            PageShape::Results => Self::validate_results(lead, &doc),
            PageShape::Detail | PageShape::NoResults => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pipeline::CheckSettings;
    use std::collections::BTreeMap;

    fn lead() -> Lead {
        let mut fields = BTreeMap::new();
        fields.insert(1, "Orange".to_string());
        fields.insert(2, "SMITH".to_string());
        fields.insert(3, "JOHN".to_string());
        fields.insert(4, "01/02/2020".to_string());
        fields.insert(5, "01/31/2020".to_string());
        fields.insert(6, "CF".to_string());
        Lead {
            id: "a1".into(),
            case_key: None,
            fields,
        }
    }

    fn search_form(last: &str, from: &str) -> String {
        format!(
            r#"<html><head><title>Orange County Search</title></head><body>
            <input id="form:search_tab:lastname" value="{last}">
            <input id="form:search_tab:fname" value="JOHN">
            <input id="form:search_tab:fromDate_input" value="{from}">
            <input id="form:search_tab:toDate_input" value="1/31/2020">
            <select><option value="CF" selected="selected">Felony</option></select>
            </body></html>"#
        )
    }

    fn results_page(name: &str, filed: &str, ucn: &str, checked: &str) -> String {
        format!(
            r#"<html><head><title>Orange County Results</title></head><body>
            <span>Charge Seq#</span>
            <div id="searchPartyResults:partySearchResultsTable">
            <input name="searchPartyResults:partySearchResultsTable_checkbox" aria-label="Select All">
            <input name="searchPartyResults:partySearchResultsTable_checkbox" {checked}>
            <table><tbody id="searchPartyResults:partySearchResultsTable_data">
            <tr class="ui-widget-content">
              <td role="gridcell">1</td><td role="gridcell">x</td><td role="gridcell">{name}</td>
            </tr>
            <tr class="ui-expanded-row-content"><td><a class="ui-link">{ucn}</a></td><td>{filed}</td></tr>
            </tbody></table></div>
            </body></html>"#
        )
    }

    #[test]
    fn matching_search_form_is_clean() {
        let check = CivitekNewCheck;
        let errors = check.validate_record(
            &lead(),
            &search_form("SMITH", "01/02/2020"),
            &CheckSettings::default(),
        );
        assert!(errors.is_empty(), "unexpected: {errors:?}");
    }

    #[test]
    fn search_form_date_compares_normalized() {
        let check = CivitekNewCheck;
        // Manifest 01/02/2020 vs page 1/2/2020: equal after normalization.
        let errors = check.validate_record(
            &lead(),
            &search_form("SMITH", "1/2/2020"),
            &CheckSettings::default(),
        );
        assert!(errors.is_empty(), "unexpected: {errors:?}");
    }

    #[test]
    fn search_form_name_mismatch_is_reported() {
        let check = CivitekNewCheck;
        let errors = check.validate_record(
            &lead(),
            &search_form("JONES", "01/02/2020"),
            &CheckSettings::default(),
        );
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "last-name");
        assert_eq!(errors[0].expected.as_deref(), Some("SMITH"));
        assert_eq!(errors[0].actual.as_deref(), Some("JONES"));
    }

    #[test]
    fn loading_results_page_is_soft() {
        let check = CivitekNewCheck;
        let html = r#"<html><head><title>Orange</title></head><body>still rendering</body></html>"#;
        let errors = check.validate_record(&lead(), html, &CheckSettings::default());
        assert_eq!(errors.len(), 1);
        assert!(!errors[0].is_hard());
        assert_eq!(errors[0].field, "loading");
    }

    #[test]
    fn matching_results_page_is_clean() {
        let check = CivitekNewCheck;
        let html = results_page("SMITH, JOHN", "1/15/2020", "48-2020-CF-000001", "checked");
        let errors = check.validate_record(&lead(), &html, &CheckSettings::default());
        assert!(errors.is_empty(), "unexpected: {errors:?}");
    }

    #[test]
    fn filed_date_outside_range_is_reported() {
        let check = CivitekNewCheck;
        let html = results_page("SMITH, JOHN", "2/15/2020", "48-2020-CF-000001", "checked");
        let errors = check.validate_record(&lead(), &html, &CheckSettings::default());
        assert!(errors.iter().any(|e| e.field == "date" && e.is_hard()));
    }

    #[test]
    fn unchecked_result_checkbox_is_reported() {
        let check = CivitekNewCheck;
        let html = results_page("SMITH, JOHN", "1/15/2020", "48-2020-CF-000001", "");
        let errors = check.validate_record(&lead(), &html, &CheckSettings::default());
        assert!(errors.iter().any(|e| e.field == "checkbox"));
    }

    #[test]
    fn missing_person_row_is_reported() {
        let check = CivitekNewCheck;
        let html = results_page("DOE, JANE", "1/15/2020", "48-2020-CF-000001", "checked");
        let errors = check.validate_record(&lead(), &html, &CheckSettings::default());
        assert!(errors.iter().any(|e| e.field == "name"));
    }

    #[test]
    fn wrong_court_code_is_reported() {
        let check = CivitekNewCheck;
        let html = results_page("SMITH, JOHN", "1/15/2020", "48-2020-DR-000001", "checked");
        let errors = check.validate_record(&lead(), &html, &CheckSettings::default());
        assert!(errors.iter().any(|e| e.field == "court-type"));
    }
}
