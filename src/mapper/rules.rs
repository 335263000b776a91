//! Per-cell transformation operations and mapping rules.
//!
//! A [`MappingRule`] ties one target column to at most one source column
//! plus an ordered chain of [`TransformOp`]s. Ops never fail: a value that
//! cannot be transformed degrades to null (or passes through, for lookups)
//! and reports an [`Effect`] so the change log can count it.

use std::collections::HashMap;

use crate::table::{parse_date, parse_number, Cell};

use super::similarity::NamePart;

/// One transformation step applied to a cell.
#[derive(Debug, Clone)]
pub enum TransformOp {
    /// Parse text into a date via the fallback format chain, re-emitting
    /// ISO-8601. Unparseable non-null values become null and are counted.
    ParseDate,

    /// Coerce to a number, tolerating currency symbols and locale
    /// separators. Unparseable non-null values become null and are counted.
    ToNumber,

    /// Multiply a numeric value by a declared factor. Never inferred.
    Scale { factor: f64 },

    /// Replace free-text categories with fixed codes from a declared table.
    /// Unmapped categories pass through unchanged and are counted.
    Lookup {
        table: HashMap<String, String>,
        case_insensitive: bool,
    },

    /// Take one part of a whitespace-split personal name.
    SplitName { part: NamePart },
}

/// Row-level side effect of applying an op, counted per target column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Effect {
    /// A non-null value could not be coerced and became null.
    NulledUnparseable,
    /// A category had no entry in the lookup table and passed through.
    UnmappedCategory,
}

impl TransformOp {
    /// Apply this op to a cell. Null input passes through untouched.
    pub fn apply(&self, cell: Cell) -> (Cell, Option<Effect>) {
        if cell.is_null() {
            return (cell, None);
        }
        match self {
            TransformOp::ParseDate => apply_parse_date(cell),
            TransformOp::ToNumber => apply_to_number(cell),
            TransformOp::Scale { factor } => apply_scale(cell, *factor),
            TransformOp::Lookup {
                table,
                case_insensitive,
            } => apply_lookup(cell, table, *case_insensitive),
            TransformOp::SplitName { part } => apply_split_name(cell, *part),
        }
    }

    /// Short label for change-log lines.
    pub fn describe(&self) -> String {
        match self {
            TransformOp::ParseDate => "parse-date".to_string(),
            TransformOp::ToNumber => "to-number".to_string(),
            TransformOp::Scale { factor } => format!("scale x{}", crate::table::format_number(*factor)),
            TransformOp::Lookup { table, .. } => format!("lookup ({} entries)", table.len()),
            TransformOp::SplitName { part } => match part {
                NamePart::First => "split-name (first token)".to_string(),
                NamePart::Rest => "split-name (remainder)".to_string(),
            },
        }
    }
}

fn apply_parse_date(cell: Cell) -> (Cell, Option<Effect>) {
    match cell {
        Cell::Date(_) => (cell, None),
        Cell::Text(s) => match parse_date(s.trim()) {
            Some(d) => (Cell::Date(d), None),
            None => (Cell::Null, Some(Effect::NulledUnparseable)),
        },
        _ => (Cell::Null, Some(Effect::NulledUnparseable)),
    }
}

fn apply_to_number(cell: Cell) -> (Cell, Option<Effect>) {
    match cell {
        Cell::Number(_) => (cell, None),
        Cell::Text(s) => match parse_number(&s) {
            Some(n) => (Cell::Number(n), None),
            None => (Cell::Null, Some(Effect::NulledUnparseable)),
        },
        Cell::Bool(b) => (Cell::Number(if b { 1.0 } else { 0.0 }), None),
        _ => (Cell::Null, Some(Effect::NulledUnparseable)),
    }
}

fn apply_scale(cell: Cell, factor: f64) -> (Cell, Option<Effect>) {
    match cell {
        Cell::Number(n) => (Cell::Number(n * factor), None),
        // Scale follows ToNumber in every generated chain; anything else
        // here is already a coercion failure counted upstream.
        other => (other, None),
    }
}

fn apply_lookup(
    cell: Cell,
    table: &HashMap<String, String>,
    case_insensitive: bool,
) -> (Cell, Option<Effect>) {
    let text = match &cell {
        Cell::Text(s) => s.clone(),
        other => other.display(),
    };

    let found = if case_insensitive {
        let key = text.to_lowercase();
        table
            .iter()
            .find(|(k, _)| k.to_lowercase() == key)
            .map(|(_, v)| v)
    } else {
        table.get(&text)
    };

    match found {
        Some(code) => (Cell::Text(code.clone()), None),
        None => (cell, Some(Effect::UnmappedCategory)),
    }
}

fn apply_split_name(cell: Cell, part: NamePart) -> (Cell, Option<Effect>) {
    match cell {
        Cell::Text(s) => {
            let mut tokens = s.split_whitespace();
            let first = tokens.next();
            match part {
                NamePart::First => match first {
                    Some(f) => (Cell::Text(f.to_string()), None),
                    None => (Cell::Null, None),
                },
                NamePart::Rest => {
                    let rest = tokens.collect::<Vec<_>>().join(" ");
                    if rest.is_empty() {
                        (Cell::Null, None)
                    } else {
                        (Cell::Text(rest), None)
                    }
                }
            }
        }
        other => (other, None),
    }
}

// =============================================================================
// MappingRule
// =============================================================================

/// Association of one target column with zero-or-one source column plus an
/// ordered chain of transformation operations.
///
/// Every target header gets exactly one rule; an unmapped target is the
/// rule with no source, which fills null for every row.
#[derive(Debug, Clone)]
pub struct MappingRule {
    /// Target column name.
    pub target: String,
    /// Source column index, if mapped.
    pub source: Option<usize>,
    /// Source column name, for the change log.
    pub source_name: Option<String>,
    /// Ordered operations applied to each cell.
    pub ops: Vec<TransformOp>,
}

impl MappingRule {
    /// The fill-null rule for an unmapped target.
    pub fn unmapped(target: &str) -> Self {
        Self {
            target: target.to_string(),
            source: None,
            source_name: None,
            ops: Vec::new(),
        }
    }

    /// A rule mapping a source column with the given op chain.
    pub fn mapped(target: &str, source: usize, source_name: &str, ops: Vec<TransformOp>) -> Self {
        Self {
            target: target.to_string(),
            source: Some(source),
            source_name: Some(source_name.to_string()),
            ops,
        }
    }

    /// Apply this rule to one row, reporting any per-cell effects.
    pub fn apply(&self, row: &[Cell], effects: &mut Vec<Effect>) -> Cell {
        let Some(idx) = self.source else {
            return Cell::Null;
        };
        let mut cell = row.get(idx).cloned().unwrap_or(Cell::Null);
        for op in &self.ops {
            let (next, effect) = op.apply(cell);
            cell = next;
            if let Some(e) = effect {
                effects.push(e);
            }
        }
        cell
    }

    /// Op labels, for the change log.
    pub fn describe_ops(&self) -> Vec<String> {
        self.ops.iter().map(|op| op.describe()).collect()
    }
}

/// Human-readable description of the available operations, for the CLI.
pub fn operations_description() -> String {
    r#"Available transformation operations:

| Operation | Description | Declared via |
|-----------|-------------|--------------|
| parse-date | Parse common date formats, re-emit ISO-8601; unparseable -> null | inferred from target header |
| to-number | Coerce to a number, tolerating currency/locale separators | inferred from target header |
| scale | Multiply by a fixed factor (e.g. monthly -> annual) | catalog "scales" entry |
| lookup | Free text -> fixed code via declared table; misses pass through | catalog "lookups" entry |
| split-name | First whitespace token or remainder of a full name | catalog "splits" entry or heuristic |

Scale and lookup rules are never inferred: declare them in the catalog file."#
        .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_parse_date_op() {
        let op = TransformOp::ParseDate;
        let (cell, effect) = op.apply(Cell::Text("15/03/1990".to_string()));
        assert_eq!(cell, Cell::Date(NaiveDate::from_ymd_opt(1990, 3, 15).unwrap()));
        assert!(effect.is_none());

        let (cell, effect) = op.apply(Cell::Text("soon".to_string()));
        assert_eq!(cell, Cell::Null);
        assert_eq!(effect, Some(Effect::NulledUnparseable));

        // Null passes through silently.
        let (cell, effect) = op.apply(Cell::Null);
        assert_eq!(cell, Cell::Null);
        assert!(effect.is_none());
    }

    #[test]
    fn test_scale_after_to_number() {
        let rule = MappingRule::mapped(
            "Annual_Salary",
            0,
            "Salário Bruto",
            vec![TransformOp::ToNumber, TransformOp::Scale { factor: 12.0 }],
        );
        let mut effects = Vec::new();
        let out = rule.apply(&[Cell::Number(5000.0)], &mut effects);
        assert_eq!(out, Cell::Number(60000.0));
        assert!(effects.is_empty());
    }

    #[test]
    fn test_lookup_miss_passes_through() {
        let mut table = HashMap::new();
        table.insert("Tecnologia da Informação".to_string(), "TI".to_string());
        let op = TransformOp::Lookup {
            table,
            case_insensitive: true,
        };

        let (hit, effect) = op.apply(Cell::Text("tecnologia da informação".to_string()));
        assert_eq!(hit, Cell::Text("TI".to_string()));
        assert!(effect.is_none());

        let (miss, effect) = op.apply(Cell::Text("Jurídico".to_string()));
        assert_eq!(miss, Cell::Text("Jurídico".to_string()));
        assert_eq!(effect, Some(Effect::UnmappedCategory));
    }

    #[test]
    fn test_split_name_parts() {
        let first = TransformOp::SplitName { part: NamePart::First };
        let rest = TransformOp::SplitName { part: NamePart::Rest };
        let name = Cell::Text("João da Silva".to_string());

        assert_eq!(first.apply(name.clone()).0, Cell::Text("João".to_string()));
        assert_eq!(rest.apply(name).0, Cell::Text("da Silva".to_string()));

        // Single-token names have no remainder.
        let mono = Cell::Text("Cher".to_string());
        assert_eq!(rest.apply(mono).0, Cell::Null);
    }

    #[test]
    fn test_unmapped_rule_fills_null() {
        let rule = MappingRule::unmapped("Employee_Id");
        let mut effects = Vec::new();
        assert_eq!(rule.apply(&[Cell::Number(1.0)], &mut effects), Cell::Null);
        assert!(effects.is_empty());
    }
}
