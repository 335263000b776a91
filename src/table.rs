//! Core tabular data model.
//!
//! This module contains the data structures every stage of the pipeline
//! operates on:
//!
//! - [`Cell`] - One scalar value (text, number, date, boolean or null)
//! - [`Table`] - Ordered headers plus rows of cells
//! - [`ColumnProfile`] - Read-only summary of one column, used by the mapper
//!
//! A `Table` is exclusively owned by whichever stage currently holds it;
//! stages hand tables over by value, never by shared mutable reference.

use chrono::NaiveDate;
use serde_json::Value;

// =============================================================================
// Cell
// =============================================================================

/// One scalar value in a table.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Missing / empty value.
    Null,
    /// Free text.
    Text(String),
    /// Numeric value (integers included).
    Number(f64),
    /// Calendar date.
    Date(NaiveDate),
    /// Boolean flag.
    Bool(bool),
}

/// The type of a cell, used for column profiling and shape matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellType {
    Null,
    Text,
    Number,
    Date,
    Bool,
}

impl Cell {
    /// Build a cell from one raw CSV field, sniffing the type.
    ///
    /// Empty strings become [`Cell::Null`]. Values that parse as a number,
    /// date or boolean are typed accordingly; everything else stays text.
    pub fn from_raw(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Cell::Null;
        }
        if let Some(date) = parse_date(trimmed) {
            return Cell::Date(date);
        }
        if let Some(n) = parse_number(trimmed) {
            return Cell::Number(n);
        }
        match trimmed.to_ascii_lowercase().as_str() {
            "true" => return Cell::Bool(true),
            "false" => return Cell::Bool(false),
            _ => {}
        }
        Cell::Text(trimmed.to_string())
    }

    /// The [`CellType`] of this cell.
    pub fn cell_type(&self) -> CellType {
        match self {
            Cell::Null => CellType::Null,
            Cell::Text(_) => CellType::Text,
            Cell::Number(_) => CellType::Number,
            Cell::Date(_) => CellType::Date,
            Cell::Bool(_) => CellType::Bool,
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Cell::Null)
    }

    /// Textual rendering used for CSV output and cell-level degrades.
    ///
    /// Dates render as ISO-8601, numbers without a trailing `.0` when
    /// integral, null as the empty string.
    pub fn display(&self) -> String {
        match self {
            Cell::Null => String::new(),
            Cell::Text(s) => s.clone(),
            Cell::Number(n) => format_number(*n),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
            Cell::Bool(b) => b.to_string(),
        }
    }

    /// JSON rendering used by the schema sampler.
    ///
    /// Dates are canonicalized to ISO-8601 strings so serialization is
    /// lossless and reversible for display.
    pub fn to_json(&self) -> Value {
        match self {
            Cell::Null => Value::Null,
            Cell::Text(s) => Value::String(s.clone()),
            Cell::Number(n) => serde_json::Number::from_f64(*n)
                .map(Value::Number)
                .unwrap_or(Value::Null),
            Cell::Date(d) => Value::String(d.format("%Y-%m-%d").to_string()),
            Cell::Bool(b) => Value::Bool(*b),
        }
    }
}

/// Format a number without a trailing `.0` when it is integral.
pub fn format_number(n: f64) -> String {
    if n.fract() == 0.0 && n.abs() < 1e15 {
        format!("{}", n as i64)
    } else {
        format!("{}", n)
    }
}

/// Parse a date with a fallback chain of common formats.
///
/// ISO-8601 is tried first; ambiguous `d/m` vs `m/d` inputs resolve in the
/// listed order, day-first before month-first.
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    const FORMATS: &[&str] = &[
        "%Y-%m-%d",
        "%d/%m/%Y",
        "%m/%d/%Y",
        "%d-%m-%Y",
        "%Y/%m/%d",
        "%d.%m.%Y",
    ];
    for fmt in FORMATS {
        if let Ok(d) = NaiveDate::parse_from_str(s, fmt) {
            return Some(d);
        }
    }
    None
}

/// Parse a number, tolerating currency symbols, thousands separators and
/// decimal commas ("R$ 1.234,56" -> 1234.56).
pub fn parse_number(s: &str) -> Option<f64> {
    let s = s.trim();
    let s = s
        .strip_prefix("R$")
        .or_else(|| s.strip_prefix("US$"))
        .unwrap_or(s);
    let cleaned: String = s
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '$' && *c != '€' && *c != '£')
        .collect();
    if cleaned.is_empty() {
        return None;
    }

    // Decide which separator is decimal: the rightmost of '.' and ','.
    let normalized = match (cleaned.rfind('.'), cleaned.rfind(',')) {
        (Some(dot), Some(comma)) if comma > dot => {
            cleaned.replace('.', "").replace(',', ".")
        }
        (Some(_), Some(_)) => cleaned.replace(',', ""),
        (None, Some(comma)) => {
            // A single comma is a decimal separator; several are thousands.
            if cleaned.matches(',').count() == 1 && cleaned.len() - comma <= 3 {
                cleaned.replace(',', ".")
            } else {
                cleaned.replace(',', "")
            }
        }
        _ => cleaned.to_string(),
    };

    normalized.parse::<f64>().ok()
}

// =============================================================================
// Table
// =============================================================================

/// An ordered sequence of rows with named columns.
///
/// Column order is significant for output and irrelevant for lookup. Every
/// row has exactly `headers.len()` cells; the reader pads or truncates raw
/// rows to enforce this.
#[derive(Debug, Clone, PartialEq)]
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<Cell>>,
}

impl Table {
    /// Create an empty table with the given headers.
    pub fn new(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.headers.len()
    }

    /// Append a row, padding with nulls or truncating to the header width.
    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.headers.len(), Cell::Null);
        self.rows.push(row);
    }

    /// Index of the first column with this name, if any.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.headers.iter().position(|h| h == name)
    }

    /// Cell at (row, column index). Out of range yields [`Cell::Null`].
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&Cell::Null)
    }

    /// Profile every column for the mapper.
    pub fn profile_columns(&self, sample_rows: usize) -> Vec<ColumnProfile> {
        (0..self.headers.len())
            .map(|col| self.profile_column(col, sample_rows))
            .collect()
    }

    fn profile_column(&self, col: usize, sample_rows: usize) -> ColumnProfile {
        let mut null_count = 0usize;
        let mut counts = [0usize; 4]; // text, number, date, bool
        for row in &self.rows {
            match row.get(col).unwrap_or(&Cell::Null) {
                Cell::Null => null_count += 1,
                Cell::Text(_) => counts[0] += 1,
                Cell::Number(_) => counts[1] += 1,
                Cell::Date(_) => counts[2] += 1,
                Cell::Bool(_) => counts[3] += 1,
            }
        }

        let non_null = self.rows.len() - null_count;
        let inferred = if non_null == 0 {
            CellType::Null
        } else {
            // Majority type among non-null cells, text on ties.
            let max = counts.iter().copied().max().unwrap_or(0);
            if counts[1] == max && max > 0 {
                CellType::Number
            } else if counts[2] == max && max > 0 {
                CellType::Date
            } else if counts[3] == max && max > 0 {
                CellType::Bool
            } else {
                CellType::Text
            }
        };

        let samples: Vec<Cell> = self
            .rows
            .iter()
            .filter_map(|r| r.get(col))
            .filter(|c| !c.is_null())
            .take(sample_rows)
            .cloned()
            .collect();

        ColumnProfile {
            name: self.headers[col].clone(),
            index: col,
            inferred,
            samples,
            null_ratio: if self.rows.is_empty() {
                0.0
            } else {
                null_count as f64 / self.rows.len() as f64
            },
        }
    }
}

// =============================================================================
// ColumnProfile
// =============================================================================

/// Derived, read-only summary of one source column.
///
/// Used only while planning the mapping; discarded afterwards.
#[derive(Debug, Clone)]
pub struct ColumnProfile {
    /// Column header.
    pub name: String,
    /// Position in the source table.
    pub index: usize,
    /// Majority type among non-null sample cells.
    pub inferred: CellType,
    /// Up to N non-null sample cells.
    pub samples: Vec<Cell>,
    /// Fraction of null cells in the column.
    pub null_ratio: f64,
}
