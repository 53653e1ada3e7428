use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::SweepError;

// --- Null marker ---

/// Written wherever a portal cell is absent, unreadable, or carries one of
/// the portal-side "no value" spellings. Downstream consumers key on this
/// exact string.
pub const NULL_MARKER: &str = "NULL";

/// Normalize one extracted cell. `None` (missing or unreadable) and the
/// known null spellings collapse to [`NULL_MARKER`]; everything else is
/// trimmed.
pub fn normalize_cell(raw: Option<&str>) -> String {
    let Some(raw) = raw else {
        return NULL_MARKER.to_string();
    };
    let trimmed = raw.trim();
    if trimmed.is_empty() || matches!(trimmed, "N/A" | "NA" | "NaN") {
        NULL_MARKER.to_string()
    } else {
        trimmed.to_string()
    }
}

// --- Search targets ---

/// A validated search name: non-empty, letters and whitespace only. Portals
/// choke on punctuation and digits in name fields, so malformed input is
/// refused before a browser session is ever spent on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTarget(String);

impl SearchTarget {
    pub fn parse(raw: &str) -> Result<Self, SweepError> {
        let name = raw.trim();
        if name.is_empty() {
            return Err(SweepError::Validation("empty name".to_string()));
        }
        let name_re = regex::Regex::new(r"^[A-Za-z\s]+$").expect("valid regex");
        if !name_re.is_match(name) {
            return Err(SweepError::Validation(format!(
                "name {name:?} contains characters other than letters and spaces"
            )));
        }
        Ok(Self(name.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SearchTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// --- Rows & pages ---

/// Ordered column layout for one portal. Every row extracted through an
/// adapter is exactly this wide.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowSchema {
    columns: Vec<String>,
}

impl RowSchema {
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }
}

/// One extracted row, normalized to its schema: exactly one cell per column,
/// nulls made explicit. A ragged extraction can never produce a ragged table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResultRow {
    cells: Vec<String>,
}

impl ResultRow {
    /// Build a row from raw extracted cells, `None` for any cell that could
    /// not be read. The row is padded or truncated to the schema width.
    pub fn from_cells(schema: &RowSchema, raw: Vec<Option<String>>) -> Self {
        let mut cells: Vec<String> = raw
            .into_iter()
            .map(|cell| normalize_cell(cell.as_deref()))
            .collect();
        cells.resize(schema.len(), NULL_MARKER.to_string());
        Self { cells }
    }

    /// A row of nothing but null markers — the placeholder line written for
    /// targets that produced no rows.
    pub fn placeholder(schema: &RowSchema) -> Self {
        Self {
            cells: vec![NULL_MARKER.to_string(); schema.len()],
        }
    }

    pub fn cells(&self) -> &[String] {
        &self.cells
    }
}

/// The rows visible on one rendered page. Structural equality against the
/// previous page is the signal that a "next" control did nothing.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageSnapshot {
    rows: Vec<ResultRow>,
}

impl PageSnapshot {
    pub fn new(rows: Vec<ResultRow>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[ResultRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

// --- Outcomes ---

/// Terminal state of one target's lookup. Failures are data, not errors: the
/// batch records an outcome for every target it attempts and the output file
/// carries it on every line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    NoResults,
    NavigationError,
    Timeout,
    PaginationLimitExceeded,
}

impl Outcome {
    /// Stable string form used in output files and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::NoResults => "no_results",
            Outcome::NavigationError => "navigation_error",
            Outcome::Timeout => "timeout",
            Outcome::PaginationLimitExceeded => "pagination_limit_exceeded",
        }
    }

    /// Whether this outcome means the target's data may be missing or
    /// incomplete. `NoResults` is a clean answer, not a failure.
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            Outcome::NavigationError | Outcome::Timeout | Outcome::PaginationLimitExceeded
        )
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Everything collected for one target. Always produced — an aggregate with
/// zero rows and a failure outcome is a valid result, not an error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregatedResult {
    pub target: SearchTarget,
    pub outcome: Outcome,
    pub rows: Vec<ResultRow>,
    pub pages_visited: u32,
    /// When this target's lookup finished. Rows in a long batch can be hours
    /// apart, so the stamp belongs to the target, not the output file.
    pub retrieved_at: DateTime<Utc>,
}

impl AggregatedResult {
    pub fn empty(target: SearchTarget, outcome: Outcome) -> Self {
        Self {
            target,
            outcome,
            rows: Vec::new(),
            pages_visited: 0,
            retrieved_at: Utc::now(),
        }
    }
}
