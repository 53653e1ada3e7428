//! Row extraction from rendered page source.
//!
//! One `page_source()` round trip per page, parsed locally, instead of a
//! WebDriver call per cell. Everything here is pure over the HTML string.

use scraper::{Html, Selector};

use recordsweep_common::{PageSnapshot, ResultRow, RowSchema, SweepError};

use crate::profiles::SiteProfile;

/// Parse the rows the profile's selectors describe out of `html`.
///
/// Cells come back in DOM order; indices listed in `drop_cells` are
/// discarded before normalization. Rows that yield no cells at all (header
/// rows, spacers) are skipped; everything else is padded or truncated to the
/// schema so a bad cell can never drop a row.
pub fn rows_from_html(
    html: &str,
    profile: &SiteProfile,
    schema: &RowSchema,
) -> Result<PageSnapshot, SweepError> {
    let row_selector = Selector::parse(&profile.row_selector).map_err(|e| {
        SweepError::Extraction(format!("invalid row selector {:?}: {e}", profile.row_selector))
    })?;
    let cell_selector = Selector::parse(&profile.cell_selector).map_err(|e| {
        SweepError::Extraction(format!(
            "invalid cell selector {:?}: {e}",
            profile.cell_selector
        ))
    })?;

    let document = Html::parse_document(html);
    let mut rows = Vec::new();

    for row in document.select(&row_selector) {
        let mut cells: Vec<Option<String>> = Vec::new();
        for (index, cell) in row.select(&cell_selector).enumerate() {
            if profile.drop_cells.contains(&index) {
                continue;
            }
            let text = cell.text().collect::<Vec<_>>().join(" ");
            cells.push(Some(text));
        }
        if cells.is_empty() {
            continue;
        }
        rows.push(ResultRow::from_cells(schema, cells));
    }

    Ok(PageSnapshot::new(rows))
}
