//! Auxiliary comparison table output.
//!
//! The table is consumed by a legacy spreadsheet workflow, so the format
//! is fixed: UTF-8 with byte-order mark, an unquoted header row, then
//! semicolon-separated, fully quoted data rows with CRLF line endings.

use crate::domain::ComparisonRow;
use anyhow::{Context as _, Result};
use csv::{QuoteStyle, Terminator, WriterBuilder};
use std::fs::File;
use std::io::Write as _;
use std::path::Path;
use tracing::debug;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";
pub const TABLE_HEADER: &str =
    "FILE_XML;ID;LAST_NAME_XML;LAST_NAME_TXT;CHECK_NAME;DATE_XML;DATE_TXT;CHECK_DATE;PAGE;URL";

/// Write the comparison table next to the content file.
pub fn write_comparison_table(path: &Path, rows: &[ComparisonRow]) -> Result<()> {
    let mut file =
        File::create(path).with_context(|| format!("create table file {}", path.display()))?;
    file.write_all(UTF8_BOM)?;
    file.write_all(TABLE_HEADER.as_bytes())?;
    file.write_all(b"\r\n")?;

    let mut writer = WriterBuilder::new()
        .delimiter(b';')
        .terminator(Terminator::CRLF)
        .quote_style(QuoteStyle::Always)
        .has_headers(false)
        .from_writer(file);
    for row in rows {
        writer.write_record([
            row.file_xml.as_str(),
            row.id.as_str(),
            row.last_name_xml.as_str(),
            row.last_name_txt.as_str(),
            bool_label(row.check_name),
            row.date_xml.as_str(),
            row.date_txt.as_str(),
            bool_label(row.check_date),
            row.page.as_str(),
            row.url.as_str(),
        ])?;
    }
    writer.flush()?;
    debug!(rows = rows.len(), path = %path.display(), "wrote comparison table");
    Ok(())
}

fn bool_label(value: bool) -> &'static str {
    if value { "True" } else { "False" }
}
