//! Target list loading.
//!
//! Inputs are spreadsheets with a `Name` column; every other column is
//! ignored. Names that fail validation are logged and counted, never
//! silently dropped.

use std::path::Path;

use anyhow::{bail, Context, Result};
use calamine::{open_workbook_auto, Data, Reader};
use tracing::warn;

use recordsweep_common::SearchTarget;

/// Read search targets from `path`, dispatching on the file extension.
/// Returns the valid targets plus the number of rows rejected by
/// validation.
pub fn load_targets(path: &Path) -> Result<(Vec<SearchTarget>, u32)> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let raw_names = match extension.as_str() {
        "csv" => read_csv_names(path)?,
        "xlsx" | "xls" => read_excel_names(path)?,
        other => bail!("Unsupported input format {other:?} (expected .csv, .xlsx or .xls)"),
    };

    let mut targets = Vec::new();
    let mut invalid = 0u32;
    for raw in raw_names {
        match SearchTarget::parse(&raw) {
            Ok(target) => targets.push(target),
            Err(err) => {
                warn!(name = raw.as_str(), error = %err, "Skipping invalid name");
                invalid += 1;
            }
        }
    }

    Ok((targets, invalid))
}

fn read_csv_names(path: &Path) -> Result<Vec<String>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open {}", path.display()))?;

    let name_idx = reader
        .headers()
        .context("Failed to read the header row")?
        .iter()
        .position(|h| h.trim().eq_ignore_ascii_case("name"))
        .context("Input file has no 'Name' column")?;

    let mut names = Vec::new();
    for record in reader.records() {
        let record = record.context("Failed to read a data row")?;
        match record.get(name_idx) {
            Some(raw) if !raw.trim().is_empty() => names.push(raw.trim().to_string()),
            _ => continue,
        }
    }
    Ok(names)
}

fn read_excel_names(path: &Path) -> Result<Vec<String>> {
    let mut workbook = open_workbook_auto(path)
        .with_context(|| format!("Failed to open workbook {}", path.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .context("Workbook has no sheets")?
        .context("Failed to read the first sheet")?;

    let mut rows = range.rows();
    let header = rows.next().context("Input file is empty")?;
    let name_idx = header
        .iter()
        .position(|cell| matches!(cell, Data::String(s) if s.trim().eq_ignore_ascii_case("name")))
        .context("Input file has no 'Name' column")?;

    let mut names = Vec::new();
    for row in rows {
        match row.get(name_idx) {
            Some(Data::Empty) | None => continue,
            Some(Data::String(s)) if s.trim().is_empty() => continue,
            Some(Data::String(s)) => names.push(s.trim().to_string()),
            // Numeric or date cells still get a shot at validation.
            Some(other) => names.push(other.to_string()),
        }
    }
    Ok(names)
}

// ============================================================================
// Tests
// ============================================================================
