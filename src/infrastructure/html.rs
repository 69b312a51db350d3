//! Tolerant extraction helpers for captured page markup.
//!
//! Input HTML is real browser-rendered markup with no well-formedness
//! guarantee, so extraction combines structural CSS-selector queries
//! (scraper) with pattern search over the raw text where the structure
//! cannot be trusted.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;

static TITLE_SEL: Lazy<Selector> = Lazy::new(|| Selector::parse("title").expect("valid selector"));
static ANY_WITH_ID_SEL: Lazy<Selector> =
    Lazy::new(|| Selector::parse("[id]").expect("valid selector"));

/// Case-number block on detail pages: a `ucn` container whose label span
/// precedes the number, with a loose fallback on the label alone.
static CASE_NUMBER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)class="ucn"[^>]*>\s*<span[^>]*>\s*Case\s*Number\s*</span>\s*([A-Za-z0-9\-/\s]+?)<br"#)
        .expect("valid case number pattern")
});
static CASE_NUMBER_FALLBACK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)>\s*Case\s*Number\s*</span>\s*([A-Za-z0-9\-/\s]+?)<")
        .expect("valid case number fallback pattern")
});

static VALUE_ATTR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?is)value="(.*?)""#).expect("valid value pattern"));
static URI_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)<Uri>(.*?)</Uri>").expect("valid uri pattern"));
static PAGE_PARAM_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[?&]page=(\d+)").expect("valid page pattern"));

pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// `<title>` text, trimmed. `None` when the page has no title element.
pub fn title_text(doc: &Html) -> Option<String> {
    doc.select(&TITLE_SEL)
        .next()
        .map(|el| el.text().collect::<String>().trim().to_string())
}

/// `value` attribute of the first element matching `selector`.
pub fn select_value_attr(doc: &Html, selector: &Selector) -> Option<String> {
    doc.select(selector)
        .next()
        .and_then(|el| el.value().attr("value"))
        .map(str::to_string)
}

/// Text of the element's own child text nodes, excluding descendants.
pub fn direct_text(el: &ElementRef<'_>) -> String {
    el.children()
        .filter_map(|node| node.value().as_text().map(|t| t.to_string()))
        .collect::<String>()
        .trim()
        .to_string()
}

/// First element whose `id` attribute contains `fragment`, case-insensitively.
pub fn element_with_id_containing<'a>(doc: &'a Html, fragment: &str) -> Option<ElementRef<'a>> {
    let fragment = fragment.to_lowercase();
    doc.select(&ANY_WITH_ID_SEL).find(|el| {
        el.value()
            .attr("id")
            .is_some_and(|id| id.to_lowercase().contains(&fragment))
    })
}

/// `value` attribute of a form input located by its `name` attribute.
/// Pattern-based because form markup in captures is routinely unclosed.
pub fn input_value(html: &str, name: &str) -> Option<String> {
    let pattern = format!(
        r#"(?is)<input[^>]*name="{}"[^>]*value="([^"]*)"[^>]*>"#,
        regex::escape(name)
    );
    Regex::new(&pattern)
        .ok()?
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
}

/// Value of a labeled `<span>` following a text label such as `Last Name:`.
pub fn labeled_span(html: &str, label: &str) -> Option<String> {
    let pattern = format!(
        r"(?is){}:\s*<span[^>]*>([\w\s%/\-]+?)</span>",
        regex::escape(label)
    );
    Regex::new(&pattern)
        .ok()?
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
}

/// Displayed case number, raw and with the two-digit county prefix
/// stripped. Both forms are uppercased with non-alphanumerics removed.
pub fn case_number_block(html: &str) -> Option<(String, String)> {
    let caps = CASE_NUMBER_RE
        .captures(html)
        .or_else(|| CASE_NUMBER_FALLBACK_RE.captures(html))?;
    let raw = strip_non_alnum_upper(&caps[1]);
    let no_prefix = strip_county_prefix(&raw).to_string();
    Some((raw, no_prefix))
}

/// Uppercase and drop everything that is not a letter or digit.
pub fn strip_non_alnum_upper(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .collect::<String>()
        .to_uppercase()
}

/// Case numbers may carry a two-digit county code prefix that the
/// manifest key does not.
pub fn strip_county_prefix(s: &str) -> &str {
    let bytes = s.as_bytes();
    if bytes.len() > 2 && bytes[0].is_ascii_digit() && bytes[1].is_ascii_digit() {
        &s[2..]
    } else {
        s
    }
}

/// Every `value="..."` attribute in the document, trimmed.
pub fn attr_value_set(html: &str) -> HashSet<String> {
    VALUE_ATTR_RE
        .captures_iter(html)
        .map(|caps| caps[1].trim().to_string())
        .collect()
}

/// `<Uri>` entries from a decoded envelope, entity-unescaped.
pub fn uri_blocks(xml: &str) -> Vec<String> {
    URI_BLOCK_RE
        .captures_iter(xml)
        .map(|caps| unescape_entities(caps[1].trim()))
        .collect()
}

/// First occurrence of a query parameter in a raw URL string. URLs in
/// captures are frequently double-escaped, so this works on text.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let pattern = format!(r"{}=([^&\s]+)", regex::escape(name));
    Regex::new(&pattern)
        .ok()?
        .captures(url)
        .map(|caps| caps[1].trim().to_string())
}

/// Every occurrence of a query parameter (repeating selectors).
pub fn query_param_all(url: &str, name: &str) -> Vec<String> {
    let pattern = format!(r"{}=([^&\s]+)", regex::escape(name));
    match Regex::new(&pattern) {
        Ok(re) => re
            .captures_iter(url)
            .map(|caps| caps[1].trim().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}

/// `page` query parameter, when present.
pub fn page_number(url: &str) -> Option<u32> {
    PAGE_PARAM_RE
        .captures(url)
        .and_then(|caps| caps[1].parse().ok())
}

/// The handful of named entities that show up in captured URLs.
pub fn unescape_entities(s: &str) -> String {
    s.replace("&amp;", "&")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
}
