//! End-to-end pipeline tests: real encoded fixtures on disk, full
//! report assertions.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use flate2::Compression;
use flate2::write::GzEncoder;
use lead_audit::{Variant, run_check};
use std::io::Write as _;
use std::path::Path;

fn encode_layer(text: &str) -> String {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(text.as_bytes()).unwrap();
    STANDARD.encode(encoder.finish().unwrap())
}

fn write_pair(dir: &Path, base: &str, manifest: &str, content_lines: &[String]) {
    std::fs::write(dir.join(format!("{base}.xml")), manifest).unwrap();
    std::fs::write(
        dir.join(format!("{base}_content.txt")),
        content_lines.join("\n"),
    )
    .unwrap();
}

fn search_form_page(last_name: &str, date_from: &str) -> String {
    format!(
        r#"<html><head><title>Orange County Search</title></head><body>
        <input id="form:search_tab:lastname" value="{last_name}">
        <input id="form:search_tab:fname" value="JOHN">
        <input id="form:search_tab:fromDate_input" value="{date_from}">
        <input id="form:search_tab:toDate_input" value="1/31/2020">
        <select><option value="CF" selected="selected">Felony</option></select>
        </body></html>"#
    )
}

const MANIFEST: &str = r#"<?xml version="1.0"?>
<LeadList xmlns="http://risk.regn.net/LeadList">
  <Lead ID="A">
    <InputValue FieldID="1">Orange</InputValue>
    <InputValue FieldID="2">SMITH</InputValue>
    <InputValue FieldID="3">JOHN</InputValue>
    <InputValue FieldID="4">01/02/2020</InputValue>
    <InputValue FieldID="5">01/31/2020</InputValue>
    <InputValue FieldID="6">CF</InputValue>
  </Lead>
  <Lead ID="B">
    <InputValue FieldID="1">Orange</InputValue>
    <InputValue FieldID="2">DOE</InputValue>
    <InputValue FieldID="3">JANE</InputValue>
    <InputValue FieldID="4">01/02/2020</InputValue>
    <InputValue FieldID="5">01/31/2020</InputValue>
    <InputValue FieldID="6">CF</InputValue>
  </Lead>
</LeadList>"#;

#[test]
fn clean_batch_reports_no_errors_per_record() {
    let dir = tempfile::tempdir().unwrap();
    // Manifest date is zero-padded, page date is not: still a match.
    write_pair(
        dir.path(),
        "batch",
        MANIFEST,
        &[
            format!("A|2020-01-02|{}", encode_layer(&search_form_page("SMITH", "1/2/2020"))),
            format!(
                "B|2020-01-02|{}",
                encode_layer(&search_form_page("DOE", "01/02/2020").replace("JOHN", "JANE"))
            ),
        ],
    );

    let report = run_check(Variant::CivitekNew, dir.path());
    assert!(report.contains("Starting check of 1 file pairs"));
    assert!(report.contains("--- Processing: batch ---"));
    assert!(report.contains("✅ ID: A | no errors found"));
    assert!(report.contains("✅ ID: B | no errors found"));
    assert!(report.contains("Total errors for file: 0 (across 0 records)"));
    assert!(report.contains("✅ Total hard errors: 0"));
}

#[test]
fn name_mismatch_produces_exactly_one_line_for_that_record() {
    let dir = tempfile::tempdir().unwrap();
    write_pair(
        dir.path(),
        "batch",
        MANIFEST,
        &[
            format!("A|2020-01-02|{}", encode_layer(&search_form_page("JONES", "1/2/2020"))),
            format!(
                "B|2020-01-02|{}",
                encode_layer(&search_form_page("DOE", "01/02/2020").replace("JOHN", "JANE"))
            ),
        ],
    );

    let report = run_check(Variant::CivitekNew, dir.path());
    let error_lines: Vec<&str> = report
        .lines()
        .filter(|l| l.trim_start().starts_with("❌ ID: A"))
        .collect();
    assert_eq!(error_lines.len(), 1, "report was:\n{report}");
    assert!(error_lines[0].contains("mismatch"));
    assert!(error_lines[0].contains("SMITH"));
    assert!(error_lines[0].contains("JONES"));
    assert!(report.contains("✅ ID: B | no errors found"));
    assert!(report.contains("Total errors for file: 1 (across 1 records)"));
    assert!(report.contains("❌ Records with errors: 1"));
}

#[test]
fn every_examined_record_is_accounted_for() {
    let dir = tempfile::tempdir().unwrap();
    write_pair(
        dir.path(),
        "batch",
        MANIFEST,
        &[
            format!("A|2020-01-02|{}", encode_layer(&search_form_page("JONES", "1/2/2020"))),
            // B is missing from the content file entirely.
        ],
    );

    let report = run_check(Variant::CivitekNew, dir.path());
    let ok_records = report
        .lines()
        .filter(|l| l.trim_start().starts_with("✅ ID:"))
        .count();
    let error_records: std::collections::HashSet<&str> = report
        .lines()
        .filter_map(|l| {
            let trimmed = l.trim_start();
            trimmed
                .strip_prefix("❌ ID: ")
                .or_else(|| trimmed.strip_prefix("⚠️ ID: "))
        })
        .filter_map(|rest| rest.split(" |").next())
        .collect();
    assert_eq!(ok_records + error_records.len(), 2, "report was:\n{report}");
    assert!(report.contains("No decoded document found for this record"));
}

#[test]
fn decode_failure_is_a_record_level_discrepancy() {
    let dir = tempfile::tempdir().unwrap();
    write_pair(
        dir.path(),
        "batch",
        MANIFEST,
        &[
            "A|2020-01-02|@@not base64@@".to_string(),
            format!(
                "B|2020-01-02|{}",
                encode_layer(&search_form_page("DOE", "01/02/2020").replace("JOHN", "JANE"))
            ),
        ],
    );

    let report = run_check(Variant::CivitekNew, dir.path());
    assert!(report.contains("❌ ID: A | Payload decode failed"));
    assert!(report.contains("✅ ID: B | no errors found"));
}

#[test]
fn unparsable_manifest_skips_the_pair_not_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    write_pair(
        dir.path(),
        "broken",
        "<LeadList><Lead",
        &[format!("A|d|{}", encode_layer("<html/>"))],
    );
    write_pair(
        dir.path(),
        "good",
        MANIFEST,
        &[
            format!("A|2020-01-02|{}", encode_layer(&search_form_page("SMITH", "1/2/2020"))),
            format!(
                "B|2020-01-02|{}",
                encode_layer(&search_form_page("DOE", "01/02/2020").replace("JOHN", "JANE"))
            ),
        ],
    );

    let report = run_check(Variant::CivitekNew, dir.path());
    assert!(report.contains("--- Processing: broken ---"));
    assert!(report.contains("[File error]: Could not read manifest"));
    // The broken pair contributes no record lines.
    assert!(!report.contains("broken | ID"));
    assert!(report.contains("--- Processing: good ---"));
    assert!(report.contains("✅ ID: A | no errors found"));
}

#[test]
fn missing_partner_file_warns_and_is_not_processed() {
    let dir = tempfile::tempdir().unwrap();
    write_pair(
        dir.path(),
        "batch",
        MANIFEST,
        &[format!("A|2020-01-02|{}", encode_layer(&search_form_page("SMITH", "1/2/2020")))],
    );
    std::fs::write(dir.path().join("lonely.xml"), MANIFEST).unwrap();
    std::fs::write(dir.path().join("orphan_content.txt"), "").unwrap();

    let report = run_check(Variant::CivitekNew, dir.path());
    assert!(report.contains("Starting check of 1 file pairs"));
    assert!(report.contains("⚠️ Found lonely.xml but no matching lonely_content.txt"));
    assert!(report.contains("⚠️ Found orphan_content.txt but no matching orphan.xml"));
    assert!(!report.contains("--- Processing: lonely ---"));
    assert!(!report.contains("--- Processing: orphan ---"));
}

#[test]
fn record_only_in_content_is_flagged_against_the_manifest() {
    let dir = tempfile::tempdir().unwrap();
    write_pair(
        dir.path(),
        "batch",
        MANIFEST,
        &[
            format!("A|2020-01-02|{}", encode_layer(&search_form_page("SMITH", "1/2/2020"))),
            format!(
                "B|2020-01-02|{}",
                encode_layer(&search_form_page("DOE", "01/02/2020").replace("JOHN", "JANE"))
            ),
            format!("GHOST|2020-01-02|{}", encode_layer("<html/>")),
        ],
    );

    let report = run_check(Variant::CivitekNew, dir.path());
    assert!(report.contains("❌ ID: GHOST | Record not present in manifest"));
}

#[test]
fn flager_detail_pages_validate_against_case_keys() {
    let dir = tempfile::tempdir().unwrap();
    let manifest = r#"<?xml version="1.0"?>
<LeadList xmlns="http://risk.regn.net/LeadList">
  <Lead ID="a1" CaseKey="2020-CF-001234"/>
  <Lead ID="b2" CaseKey="2020-CF-005678"/>
</LeadList>"#;
    let detail = |case: &str| {
        format!(
            r#"<html><body><div id="summaryAccordion"></div><dd class="casenumber">{case}</dd></body></html>"#
        )
    };
    let nested = |html: &str| {
        let inner = encode_layer(html);
        encode_layer(&format!(
            "<Wrapper><Base64EncodedGZipCompressedContent>{inner}</Base64EncodedGZipCompressedContent></Wrapper>"
        ))
    };
    write_pair(
        dir.path(),
        "batch",
        manifest,
        &[
            format!("a1|2020-01-02|{}", nested(&detail("2020-CF-001234"))),
            format!("b2|2020-01-02|{}", nested(&detail("2020-CF-999999"))),
        ],
    );

    let report = run_check(Variant::Flager, dir.path());
    assert!(report.contains("✅ ID: a1 | no errors found"));
    assert!(report.contains("❌ ID: b2 | Case number mismatch"));
    assert!(report.contains("Total errors for file: 1 (across 1 records)"));
}
