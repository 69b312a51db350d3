//! Field comparison rules.
//!
//! The comparison policy is not uniform across fields: names compare
//! exactly after case/whitespace normalization, county names by
//! containment, dates after numeric normalization, date ranges by
//! inclusive containment, and court-type codes by positional extraction
//! from the composite case number.

use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;

static COURT_CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\d{4}([A-Z]{1,3})").expect("valid court code pattern"));
static FILED_FROM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"filedDateFrom=(\d{4}-\d{2}-\d{2})").expect("valid pattern"));
static FILED_TO_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"filedDateTo=(\d{4}-\d{2}-\d{2})").expect("valid pattern"));

/// Normalize an `M/D/YYYY`-ish date string: numeric components, no
/// zero padding, and a `0` month or day coerced to `1`. Unparsable
/// input is returned unchanged, which keeps the function idempotent.
pub fn normalize_date(s: &str) -> String {
    let parts: Vec<&str> = s.trim().split('/').collect();
    if parts.len() != 3 {
        return s.to_string();
    }
    let parsed: Option<(u32, u32, i32)> = (|| {
        Some((
            parts[0].trim().parse().ok()?,
            parts[1].trim().parse().ok()?,
            parts[2].trim().parse().ok()?,
        ))
    })();
    match parsed {
        Some((month, day, year)) => {
            let month = if month == 0 { 1 } else { month };
            let day = if day == 0 { 1 } else { day };
            format!("{month}/{day}/{year}")
        }
        None => s.to_string(),
    }
}

/// Parse a month/day/year date, tolerating missing zero padding.
pub fn parse_mdy(s: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(normalize_date(s).as_str(), "%m/%d/%Y").ok()
}

/// Inclusive range containment for filed-date checks.
pub fn date_within(date: NaiveDate, from: NaiveDate, to: NaiveDate) -> bool {
    from <= date && date <= to
}

/// Uppercase and collapse interior whitespace runs to single spaces.
pub fn normalize_name(s: &str) -> String {
    s.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Name equality: case-insensitive and whitespace-insensitive.
pub fn names_match(expected: &str, actual: &str) -> bool {
    normalize_name(expected) == normalize_name(actual)
}

/// Containment after removing all whitespace, case-insensitively.
/// Page titles carry decoration around the county name.
pub fn contains_normalized(haystack: &str, needle: &str) -> bool {
    let squash = |s: &str| {
        s.chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_lowercase()
    };
    squash(haystack).contains(&squash(needle))
}

/// Court-type code from a composite case number: strip non-alphanumerics
/// and the two-digit county prefix, then take the first letter run after
/// the four-digit year.
pub fn court_code(ucn: &str) -> Option<String> {
    let mut normalized: String = ucn
        .chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase();
    let has_county_prefix = {
        let bytes = normalized.as_bytes();
        bytes.len() > 2 && bytes[0].is_ascii_digit() && bytes[1].is_ascii_digit()
    };
    if has_county_prefix {
        normalized.drain(..2);
    }
    COURT_CODE_RE
        .captures(&normalized)
        .map(|caps| caps[1].to_string())
}

/// Zero-pad both sides of a `from - to` date range. Input without a
/// dash (or with unexpected structure) is returned unchanged.
pub fn normalize_date_range(s: &str) -> String {
    let Some((left, right)) = s.split_once('-') else {
        return s.to_string();
    };
    match (pad_date(left.trim()), pad_date(right.trim())) {
        (Some(from), Some(to)) => format!("{from} - {to}"),
        _ => s.to_string(),
    }
}

fn pad_date(s: &str) -> Option<String> {
    let parts: Vec<&str> = s.split('/').collect();
    if parts.len() != 3 {
        return None;
    }
    Some(format!("{:0>2}/{:0>2}/{}", parts[0], parts[1], parts[2]))
}

/// Date range from `filedDateFrom`/`filedDateTo` ISO query parameters,
/// rendered as `MM/DD/YYYY - MM/DD/YYYY`.
pub fn date_range_from_url(url: &str) -> Option<String> {
    let from = FILED_FROM_RE.captures(url)?;
    let to = FILED_TO_RE.captures(url)?;
    Some(format!(
        "{} - {}",
        iso_to_mdy(&from[1])?,
        iso_to_mdy(&to[1])?
    ))
}

fn iso_to_mdy(iso: &str) -> Option<String> {
    let date = NaiveDate::parse_from_str(iso, "%Y-%m-%d").ok()?;
    Some(date.format("%m/%d/%Y").to_string())
}
