//! Schema sampler: bounded row samples for mapping diagnostics.
//!
//! Pure functions over a [`Table`]; nothing here mutates anything.

use serde_json::{Map, Value};

use crate::table::Table;

/// Default number of sample rows.
pub const DEFAULT_SAMPLE_ROWS: usize = 5;

/// Take the first `min(limit, row_count)` rows as JSON objects.
///
/// Temporal values are canonicalized to ISO-8601 strings so the sample
/// serializes losslessly and reads back the same for display.
pub fn sample_rows(table: &Table, limit: usize) -> Vec<Value> {
    table
        .rows()
        .iter()
        .take(limit.min(table.row_count()))
        .map(|row| {
            let obj: Map<String, Value> = table
                .headers()
                .iter()
                .zip(row.iter())
                .map(|(h, c)| (h.clone(), c.to_json()))
                .collect();
            Value::Object(obj)
        })
        .collect()
}

/// Render a sample as a compact JSON string for logs and diagnostics.
pub fn sample_to_json(table: &Table, limit: usize) -> String {
    serde_json::to_string(&sample_rows(table, limit)).unwrap_or_else(|_| "[]".to_string())
}
