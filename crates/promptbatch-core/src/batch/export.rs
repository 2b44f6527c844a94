//! CSV export of reconciled results.

use crate::batch::error::{BatchError, Result};
use crate::batch::types::ResultTable;
use once_cell::sync::Lazy;
use regex::Regex;
use std::path::Path;
use tracing::info;

/// File name used when no output path is given.
pub const DEFAULT_FILE_NAME: &str = "batch_results.csv";

/// UTF-8 byte-order mark written before the CSV text.
pub const UTF8_BOM: &str = "\u{feff}";

const HEADER: &str = "Input,Output";

static LINE_BREAKS: Lazy<Regex> = Lazy::new(|| Regex::new(r"[\r\n]+").expect("valid regex"));

/// Collapses every run of line breaks to a single space.
///
/// Quotes are left alone; the CSV writer doubles them.
pub fn flatten_field(field: &str) -> String {
    LINE_BREAKS.replace_all(field, " ").into_owned()
}

/// Escape a field the way it appears in the exported file: flattened, quotes doubled, quoted.
pub fn escape_field(field: &str) -> String {
    format!("\"{}\"", flatten_field(field).replace('"', "\"\""))
}

/// Renders `table` as CSV text.
///
/// The header is unquoted; every data field is quoted. Rows are separated by
/// `\n` and the text does not end with a newline.
///
/// # Errors
/// Returns `ExportError` if the CSV writer fails.
pub fn export(table: &ResultTable) -> Result<String> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .quote_style(csv::QuoteStyle::Always)
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    for row in table.rows() {
        writer
            .write_record([flatten_field(&row.input), flatten_field(&row.output)])
            .map_err(|e| BatchError::ExportError(e.to_string()))?;
    }

    let data = writer
        .into_inner()
        .map_err(|e| BatchError::ExportError(format!("Failed to get CSV data: {}", e)))?;
    let body = String::from_utf8(data)
        .map_err(|e| BatchError::ExportError(format!("Invalid UTF-8 in CSV: {}", e)))?;

    let mut text = String::with_capacity(HEADER.len() + 1 + body.len());
    text.push_str(HEADER);
    if !body.is_empty() {
        text.push('\n');
        text.push_str(body.trim_end_matches('\n'));
    }
    Ok(text)
}

/// Writes `csv` to `path` prefixed with a UTF-8 byte-order mark.
///
/// Missing parent directories are created.
///
/// # Errors
/// Returns `Io` if the file cannot be written.
pub fn save_csv(path: &Path, csv: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let mut bytes = Vec::with_capacity(UTF8_BOM.len() + csv.len());
    bytes.extend_from_slice(UTF8_BOM.as_bytes());
    bytes.extend_from_slice(csv.as_bytes());
    std::fs::write(path, bytes)?;

    info!(path = %path.display(), "Results saved");
    Ok(())
}
