//! Completeness checks over the comparison table.
//!
//! These operate on the whole table (and the decoded documents) rather
//! than one record at a time: duplicate page detection, pagination
//! completeness against the page's own total-record indicator, and the
//! required query-flag audit.

use crate::domain::{ComparisonRow, Discrepancy};
use crate::infrastructure::html;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::{BTreeMap, BTreeSet, HashSet};

static TOTAL_RECORD_COUNT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"Total Record Count:\s*(\d+)").expect("valid count pattern"));

/// Case-status selectors every search URL must carry, exactly.
const REQUIRED_CASE_STATUS: [&str; 3] = ["adjudicated", "disposed", "closed"];
/// Case-type subcategory selectors every search URL must carry, exactly.
const REQUIRED_CASE_TYPE_SUBCATEGORY: [&str; 1] = ["1"];

/// One discrepancy per record whose name comparison failed.
pub fn check_names(rows: &[ComparisonRow]) -> Vec<Discrepancy> {
    let mut flagged = HashSet::new();
    rows.iter()
        .filter(|row| !row.check_name && flagged.insert(row.id.clone()))
        .map(|row| {
            Discrepancy::hard(
                &row.id,
                "name",
                format!(
                    "Name mismatch (manifest '{}' vs content '{}')",
                    row.last_name_xml, row.last_name_txt
                ),
            )
            .with_values(&row.last_name_xml, &row.last_name_txt)
        })
        .collect()
}

/// One discrepancy per record whose date-range comparison failed.
pub fn check_dates(rows: &[ComparisonRow]) -> Vec<Discrepancy> {
    let mut flagged = HashSet::new();
    rows.iter()
        .filter(|row| !row.check_date && flagged.insert(row.id.clone()))
        .map(|row| {
            Discrepancy::hard(
                &row.id,
                "date",
                format!(
                    "Date range mismatch (manifest '{}' vs content '{}')",
                    row.date_xml, row.date_txt
                ),
            )
            .with_values(&row.date_xml, &row.date_txt)
        })
        .collect()
}

/// Flag identifiers with a repeated (ID, page) combination. A record is
/// flagged once however many duplicate occurrences it has.
pub fn check_duplicates(rows: &[ComparisonRow]) -> Vec<Discrepancy> {
    let mut seen_pages: HashSet<(String, String)> = HashSet::new();
    let mut flagged: HashSet<String> = HashSet::new();
    let mut errors = Vec::new();
    for row in rows {
        let key = (row.id.clone(), row.page.clone());
        if !seen_pages.insert(key) && flagged.insert(row.id.clone()) {
            errors.push(Discrepancy::hard(
                &row.id,
                "duplicate",
                "Duplicate ID and page combination",
            ));
        }
    }
    errors
}

/// Verify the fixed status/category selector set on every search URL.
pub fn check_required_flags(rows: &[ComparisonRow]) -> Vec<Discrepancy> {
    let required_status: BTreeSet<String> =
        REQUIRED_CASE_STATUS.iter().map(|s| (*s).to_string()).collect();
    let required_subcategory: BTreeSet<String> =
        REQUIRED_CASE_TYPE_SUBCATEGORY.iter().map(|s| (*s).to_string()).collect();
    let mut flagged = HashSet::new();
    let mut errors = Vec::new();
    for row in rows {
        if html::query_param(&row.url, "lastName").is_none() {
            continue;
        }
        let statuses: BTreeSet<String> =
            html::query_param_all(&row.url, "caseStatus").into_iter().collect();
        let subcategories: BTreeSet<String> =
            html::query_param_all(&row.url, "caseTypeSubCategory").into_iter().collect();
        if (statuses != required_status || subcategories != required_subcategory)
            && flagged.insert(row.id.clone())
        {
            errors.push(Discrepancy::hard(
                &row.id,
                "query-flags",
                "Missing or wrong caseStatus / caseTypeSubCategory selectors",
            ));
        }
    }
    errors
}

/// Pagination completeness: the decoded page advertises its total record
/// count; with a fixed page size the observed page set must be exactly
/// `{1..=ceil(total / page_size)}`.
pub fn check_pagination<'a>(
    rows: &[ComparisonRow],
    document_for: impl Fn(&str) -> Option<&'a str>,
    page_size: usize,
) -> Vec<Discrepancy> {
    let mut pages_by_id: BTreeMap<String, BTreeSet<u32>> = BTreeMap::new();
    for row in rows {
        if let Some(page) = html::page_number(&row.url) {
            pages_by_id.entry(row.id.clone()).or_default().insert(page);
        }
    }

    let mut errors = Vec::new();
    for (id, observed) in &pages_by_id {
        let Some(html_content) = document_for(id) else {
            continue;
        };
        let Some(total) = total_record_count(html_content) else {
            continue;
        };
        let expected_pages = total.div_ceil(page_size);
        if expected_pages == 0 {
            continue;
        }
        let expected: BTreeSet<u32> = (1..=expected_pages as u32).collect();
        if *observed != expected {
            errors.push(Discrepancy::hard(
                id,
                "pagination",
                format!(
                    "Incomplete collection (expected {} pages, found {})",
                    expected_pages,
                    observed.len()
                ),
            ));
        }
    }
    errors
}

/// `Total Record Count: N` indicator from a decoded results page.
pub fn total_record_count(html_content: &str) -> Option<usize> {
    TOTAL_RECORD_COUNT_RE
        .captures(html_content)
        .and_then(|caps| caps[1].parse().ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(id: &str, page: &str, url: &str) -> ComparisonRow {
        ComparisonRow {
            file_xml: "batch.xml".into(),
            id: id.into(),
            last_name_xml: "SMITH".into(),
            last_name_txt: "SMITH".into(),
            check_name: true,
            date_xml: String::new(),
            date_txt: String::new(),
            check_date: true,
            page: page.into(),
            url: url.into(),
        }
    }

    #[test]
    fn duplicate_id_page_is_flagged_once() {
        let rows = vec![
            row("a1", "1", "https://x?page=1"),
            row("a1", "1", "https://x?page=1"),
            row("a1", "1", "https://x?page=1"),
            row("b2", "1", "https://x?page=1"),
        ];
        let errors = check_duplicates(&rows);
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].record_id, "a1");
    }

    #[test]
    fn name_failures_deduplicate_per_record() {
        let mut bad = row("a1", "1", "https://x?page=1");
        bad.check_name = false;
        let mut bad2 = bad.clone();
        bad2.page = "2".into();
        let errors = check_names(&[bad, bad2]);
        assert_eq!(errors.len(), 1);
    }

    #[test]
    fn required_flags_must_match_exactly() {
        let good = row(
            "a1",
            "1",
            "https://x?lastName=S&caseStatus=adjudicated&caseStatus=disposed&caseStatus=closed&caseTypeSubCategory=1",
        );
        let missing = row("b2", "1", "https://x?lastName=S&caseStatus=closed&caseTypeSubCategory=1");
        let extra = row(
            "c3",
            "1",
            "https://x?lastName=S&caseStatus=adjudicated&caseStatus=disposed&caseStatus=closed&caseStatus=open&caseTypeSubCategory=1",
        );
        let no_search = row("d4", "1", "https://x?page=1");
        let errors = check_required_flags(&[good, missing, extra, no_search]);
        let ids: Vec<&str> = errors.iter().map(|e| e.record_id.as_str()).collect();
        assert_eq!(ids, vec!["b2", "c3"]);
    }

    #[test]
    fn pagination_expected_set_law() {
        // 25 records, page size 10 -> pages {1, 2, 3}
        let html = "<div>Total Record Count: 25</div>";
        let complete = vec![
            row("a1", "1", "https://x?page=1"),
            row("a1", "2", "https://x?page=2"),
            row("a1", "3", "https://x?page=3"),
        ];
        assert!(check_pagination(&complete, |_| Some(html), 10).is_empty());

        let gap = vec![
            row("a1", "1", "https://x?page=1"),
            row("a1", "3", "https://x?page=3"),
        ];
        let errors = check_pagination(&gap, |_| Some(html), 10);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].message.contains("expected 3 pages, found 2"));

        let surplus = vec![
            row("a1", "1", "https://x?page=1"),
            row("a1", "2", "https://x?page=2"),
            row("a1", "3", "https://x?page=3"),
            row("a1", "4", "https://x?page=4"),
        ];
        assert_eq!(check_pagination(&surplus, |_| Some(html), 10).len(), 1);
    }

    #[test]
    fn zero_total_records_needs_no_pages() {
        let html = "<div>Total Record Count: 0</div>";
        let rows = vec![row("a1", "1", "https://x?page=1")];
        assert!(check_pagination(&rows, |_| Some(html), 10).is_empty());
    }
}
