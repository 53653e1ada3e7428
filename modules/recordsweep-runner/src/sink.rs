//! Result sinks: one combined output file per batch.
//!
//! Every aggregate contributes at least one line, so an operator can tell
//! "no results" from "lookup failed" without consulting the logs.

use std::fs;
use std::path::PathBuf;

use serde_json::{json, Map, Value};

use recordsweep_common::{AggregatedResult, ResultRow, RowSchema, SweepError};

pub trait ResultSink {
    fn write(
        &mut self,
        schema: &RowSchema,
        results: &[AggregatedResult],
    ) -> Result<(), SweepError>;
}

fn sink_err(err: impl std::fmt::Display) -> SweepError {
    SweepError::Sink(err.to_string())
}

// ---------------------------------------------------------------------------
// CSV
// ---------------------------------------------------------------------------

/// Flat table: `Searched Name`, `Outcome`, `Retrieved At`, then the adapter
/// columns. Aggregates without rows emit a single all-marker placeholder line.
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for CsvSink {
    fn write(
        &mut self,
        schema: &RowSchema,
        results: &[AggregatedResult],
    ) -> Result<(), SweepError> {
        let mut writer = csv::Writer::from_path(&self.path).map_err(|e| {
            SweepError::Sink(format!("failed to open {}: {e}", self.path.display()))
        })?;

        let mut header = vec!["Searched Name", "Outcome", "Retrieved At"];
        header.extend(schema.columns().iter().map(|c| c.as_str()));
        writer.write_record(&header).map_err(sink_err)?;

        for aggregate in results {
            // Stamped when the target's collection finished, not when the
            // file was written; in a long batch those are hours apart.
            let retrieved_at = aggregate.retrieved_at.to_rfc3339();
            if aggregate.rows.is_empty() {
                let placeholder = ResultRow::placeholder(schema);
                write_line(&mut writer, aggregate, &retrieved_at, placeholder.cells())?;
            } else {
                for row in &aggregate.rows {
                    write_line(&mut writer, aggregate, &retrieved_at, row.cells())?;
                }
            }
        }

        writer.flush().map_err(sink_err)
    }
}

fn write_line(
    writer: &mut csv::Writer<fs::File>,
    aggregate: &AggregatedResult,
    retrieved_at: &str,
    cells: &[String],
) -> Result<(), SweepError> {
    let mut record = Vec::with_capacity(cells.len() + 3);
    record.push(aggregate.target.as_str());
    record.push(aggregate.outcome.as_str());
    record.push(retrieved_at);
    record.extend(cells.iter().map(|c| c.as_str()));
    writer.write_record(&record).map_err(sink_err)
}

// ---------------------------------------------------------------------------
// JSON
// ---------------------------------------------------------------------------

/// Envelope `{"status": ..., "data": [...]}` with one object per row.
/// Status flips to `completed_with_errors` when any target recorded a
/// failure outcome.
pub struct JsonSink {
    path: PathBuf,
}

impl JsonSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl ResultSink for JsonSink {
    fn write(
        &mut self,
        schema: &RowSchema,
        results: &[AggregatedResult],
    ) -> Result<(), SweepError> {
        let mut data = Vec::new();
        for aggregate in results {
            if aggregate.rows.is_empty() {
                let placeholder = ResultRow::placeholder(schema);
                data.push(row_object(schema, aggregate, placeholder.cells()));
            } else {
                for row in &aggregate.rows {
                    data.push(row_object(schema, aggregate, row.cells()));
                }
            }
        }

        let status = if results.iter().any(|r| r.outcome.is_failure()) {
            "completed_with_errors"
        } else {
            "success"
        };

        let envelope = json!({ "status": status, "data": data });
        let body = serde_json::to_string_pretty(&envelope).map_err(sink_err)?;
        fs::write(&self.path, body).map_err(|e| {
            SweepError::Sink(format!("failed to write {}: {e}", self.path.display()))
        })
    }
}

fn row_object(schema: &RowSchema, aggregate: &AggregatedResult, cells: &[String]) -> Value {
    let mut object = Map::new();
    object.insert(
        "searched_name".to_string(),
        Value::String(aggregate.target.as_str().to_string()),
    );
    object.insert(
        "outcome".to_string(),
        Value::String(aggregate.outcome.as_str().to_string()),
    );
    for (column, cell) in schema.columns().iter().zip(cells) {
        object.insert(column.clone(), Value::String(cell.clone()));
    }
    Value::Object(object)
}

// ============================================================================
// Tests
// ============================================================================
