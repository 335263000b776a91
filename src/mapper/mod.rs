//! Field mapper: the schema-reconciliation engine.
//!
//! Given a source [`Table`] and the template's target headers, the mapper
//! produces one [`MappingRule`] per target column and applies them to every
//! source row, yielding an output table whose columns exactly equal the
//! target headers plus a change log of every decision.
//!
//! Planning order per target column:
//!
//! 1. Declared catalog split rules (earliest-registered wins)
//! 2. Similarity inference (name tokens + value shape, above a threshold)
//! 3. Heuristic full-name decomposition
//! 4. The fill-null rule
//!
//! Declared scale factors and lookup tables attach to whatever source
//! mapping results. The whole process is deterministic: same inputs, same
//! catalog, same output.

pub mod catalog;
pub mod rules;
pub mod similarity;

pub use catalog::{example_catalog, LookupRule, ScaleRule, SplitRule, TransformCatalog};
pub use rules::{operations_description, Effect, MappingRule, TransformOp};
pub use similarity::NamePart;

use crate::changelog::{ChangeLog, ChangeLogEntry};
use crate::table::{CellType, ColumnProfile, Table};

use similarity::{
    candidate_score, expected_type, looks_like_full_name, name_part, normalize_key, tokenize,
};

/// Tuning knobs for the mapper, initialized once at startup.
#[derive(Debug, Clone)]
pub struct MapperOptions {
    /// Minimum combined similarity score for a source column to be chosen.
    pub threshold: f64,
    /// Rows sampled per column when profiling value shapes.
    pub sample_rows: usize,
}

impl Default for MapperOptions {
    fn default() -> Self {
        Self {
            threshold: 0.45,
            sample_rows: crate::sampler::DEFAULT_SAMPLE_ROWS,
        }
    }
}

/// Two candidates closer than this tie; the first source column wins.
const TIE_EPSILON: f64 = 1e-6;

/// A planned rule plus any note worth surfacing in the change log.
#[derive(Debug, Clone)]
pub struct PlannedRule {
    pub rule: MappingRule,
    pub note: Option<String>,
}

/// Result of a full mapping run.
#[derive(Debug)]
pub struct MappedOutput {
    /// Table whose column set and order exactly equal the target headers.
    pub table: Table,
    /// One entry per target column, in target order.
    pub changelog: ChangeLog,
}

/// Map a source table onto the target headers and produce the output table
/// plus change log. This is the mapper's single entry point.
pub fn map_table(
    source: &Table,
    targets: &[String],
    catalog: &TransformCatalog,
    opts: &MapperOptions,
) -> MappedOutput {
    let plan = plan_rules(source, targets, catalog, opts);
    apply_plan(source, targets, &plan)
}

// =============================================================================
// Planning
// =============================================================================

/// Produce exactly one rule per target header, in target order.
pub fn plan_rules(
    source: &Table,
    targets: &[String],
    catalog: &TransformCatalog,
    opts: &MapperOptions,
) -> Vec<PlannedRule> {
    let profiles = source.profile_columns(opts.sample_rows);
    targets
        .iter()
        .map(|target| plan_target(target, &profiles, catalog, opts))
        .collect()
}

fn plan_target(
    target: &str,
    profiles: &[ColumnProfile],
    catalog: &TransformCatalog,
    opts: &MapperOptions,
) -> PlannedRule {
    let tokens = tokenize(target);
    let expected = expected_type(&tokens);

    // 1. Declared split rules claim their targets outright.
    if let Some((split, part)) = catalog.split_for(target) {
        let source_key = normalize_key(&split.source);
        if let Some(profile) = profiles.iter().find(|p| normalize_key(&p.name) == source_key) {
            let ops = with_declared(
                vec![TransformOp::SplitName { part }],
                target,
                CellType::Text,
                catalog,
            );
            return PlannedRule {
                rule: MappingRule::mapped(target, profile.index, &profile.name, ops),
                note: Some("declared split rule".to_string()),
            };
        }
        // The declared source is absent from this file; fall through to
        // inference but say so.
        return plan_by_similarity(
            target,
            &tokens,
            expected,
            profiles,
            catalog,
            opts,
            Some(format!("declared split source \"{}\" not present", split.source)),
        );
    }

    plan_by_similarity(target, &tokens, expected, profiles, catalog, opts, None)
}

#[allow(clippy::too_many_arguments)]
fn plan_by_similarity(
    target: &str,
    tokens: &[String],
    expected: CellType,
    profiles: &[ColumnProfile],
    catalog: &TransformCatalog,
    opts: &MapperOptions,
    mut note: Option<String>,
) -> PlannedRule {
    // 2. Score every source column; strict comparison keeps the first of
    // any tie, matching original source order.
    let mut best: Option<(usize, f64)> = None;
    let mut tied_with: Option<usize> = None;
    for (i, profile) in profiles.iter().enumerate() {
        let score = candidate_score(tokens, expected, profile);
        match best {
            None => best = Some((i, score)),
            Some((_, top)) if score > top + TIE_EPSILON => {
                best = Some((i, score));
                tied_with = None;
            }
            Some((_, top)) if (score - top).abs() <= TIE_EPSILON => {
                if tied_with.is_none() {
                    tied_with = Some(i);
                }
            }
            _ => {}
        }
    }

    if let Some((idx, score)) = best {
        if score >= opts.threshold {
            let profile = &profiles[idx];
            if let Some(tie_idx) = tied_with {
                let ambiguity = format!(
                    "ambiguous with column {} \"{}\"; first source column kept",
                    tie_idx + 1,
                    profiles[tie_idx].name
                );
                note = Some(match note {
                    Some(n) => format!("{}; {}", n, ambiguity),
                    None => ambiguity,
                });
            }

            // A first/last-name target matched against a full-name column
            // still needs decomposition, not a straight copy.
            if let Some(part) = name_part(tokens) {
                if looks_like_full_name(profile) {
                    let ops = with_declared(
                        vec![TransformOp::SplitName { part }],
                        target,
                        CellType::Text,
                        catalog,
                    );
                    return PlannedRule {
                        rule: MappingRule::mapped(target, profile.index, &profile.name, ops),
                        note: Some(note.map_or_else(
                            || "decomposed full-name column".to_string(),
                            |n| format!("{}; decomposed full-name column", n),
                        )),
                    };
                }
            }

            let ops = with_declared(base_ops(expected), target, expected, catalog);
            return PlannedRule {
                rule: MappingRule::mapped(target, profile.index, &profile.name, ops),
                note,
            };
        }
    }

    // 3. Nothing cleared the threshold: try full-name decomposition.
    if let Some(part) = name_part(tokens) {
        if let Some(profile) = profiles.iter().find(|p| looks_like_full_name(p)) {
            let ops = with_declared(
                vec![TransformOp::SplitName { part }],
                target,
                CellType::Text,
                catalog,
            );
            return PlannedRule {
                rule: MappingRule::mapped(target, profile.index, &profile.name, ops),
                note: Some(format!("decomposed from \"{}\"", profile.name)),
            };
        }
    }

    // 4. Unmapped: fill null for every row.
    PlannedRule {
        rule: MappingRule::unmapped(target),
        note,
    }
}

/// Coercions implied by the target's expected type.
fn base_ops(expected: CellType) -> Vec<TransformOp> {
    match expected {
        CellType::Date => vec![TransformOp::ParseDate],
        CellType::Number => vec![TransformOp::ToNumber],
        _ => Vec::new(),
    }
}

/// Append declared catalog transforms (scale, then lookup) to an op chain.
fn with_declared(
    mut ops: Vec<TransformOp>,
    target: &str,
    expected: CellType,
    catalog: &TransformCatalog,
) -> Vec<TransformOp> {
    if let Some(scale) = catalog.scale_for(target) {
        if expected != CellType::Number {
            ops.push(TransformOp::ToNumber);
        }
        ops.push(TransformOp::Scale {
            factor: scale.factor,
        });
    }
    if let Some(lookup) = catalog.lookup_for(target) {
        ops.push(TransformOp::Lookup {
            table: lookup.mapping.clone(),
            case_insensitive: lookup.case_insensitive,
        });
    }
    ops
}

// =============================================================================
// Application
// =============================================================================

/// Apply a plan to every source row, producing the output table and the
/// change log. Rows are independent; no serialized copy of the input is
/// ever built alongside it.
pub fn apply_plan(source: &Table, targets: &[String], plan: &[PlannedRule]) -> MappedOutput {
    let mut output = Table::new(targets.to_vec());
    let mut null_counts = vec![0usize; plan.len()];
    let mut unmapped_counts = vec![0usize; plan.len()];
    let mut effects = Vec::new();

    for row in source.rows() {
        let mut out_row = Vec::with_capacity(plan.len());
        for (i, planned) in plan.iter().enumerate() {
            effects.clear();
            let cell = planned.rule.apply(row, &mut effects);
            if cell.is_null() {
                null_counts[i] += 1;
            }
            for effect in &effects {
                if *effect == Effect::UnmappedCategory {
                    unmapped_counts[i] += 1;
                }
            }
            out_row.push(cell);
        }
        output.push_row(out_row);
    }

    let mut changelog = ChangeLog::new(source.row_count());
    for (i, planned) in plan.iter().enumerate() {
        changelog.push(ChangeLogEntry {
            target: planned.rule.target.clone(),
            source: planned.rule.source_name.clone(),
            transforms: planned.rule.describe_ops(),
            null_count: null_counts[i],
            unmapped_categories: unmapped_counts[i],
            note: planned.note.clone(),
        });
    }

    MappedOutput {
        table: output,
        changelog,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;
    use chrono::NaiveDate;

    fn brazilian_source() -> Table {
        let mut t = Table::new(vec![
            "Nome Completo".to_string(),
            "Data Nasc.".to_string(),
            "Salário Bruto".to_string(),
            "Departamento".to_string(),
        ]);
        t.push_row(vec![
            Cell::Text("João Silva".to_string()),
            Cell::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()),
            Cell::Number(5000.0),
            Cell::Text("TI".to_string()),
        ]);
        t
    }

    fn english_targets() -> Vec<String> {
        vec![
            "First_Name".to_string(),
            "Last_Name".to_string(),
            "Birth_Date".to_string(),
            "Annual_Salary".to_string(),
            "Dept_Code".to_string(),
        ]
    }

    fn scenario_catalog() -> TransformCatalog {
        // Declared monthly->annual salary rule and name-split rule; no
        // lookup table for Dept_Code.
        TransformCatalog {
            description: String::new(),
            scales: vec![ScaleRule {
                target: "Annual_Salary".to_string(),
                factor: 12.0,
                reason: "monthly source".to_string(),
            }],
            lookups: vec![],
            splits: vec![SplitRule {
                source: "Nome Completo".to_string(),
                first_targets: vec!["First_Name".to_string()],
                last_targets: vec!["Last_Name".to_string()],
            }],
        }
    }

    #[test]
    fn test_brazilian_hr_scenario() {
        let source = brazilian_source();
        let targets = english_targets();
        let out = map_table(
            &source,
            &targets,
            &scenario_catalog(),
            &MapperOptions::default(),
        );

        assert_eq!(out.table.headers(), targets.as_slice());
        assert_eq!(out.table.row_count(), 1);
        assert_eq!(*out.table.cell(0, 0), Cell::Text("João".to_string()));
        assert_eq!(*out.table.cell(0, 1), Cell::Text("Silva".to_string()));
        assert_eq!(
            *out.table.cell(0, 2),
            Cell::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap())
        );
        assert_eq!(*out.table.cell(0, 3), Cell::Number(60000.0));
        // Dept_Code has no lookup table: passthrough.
        assert_eq!(*out.table.cell(0, 4), Cell::Text("TI".to_string()));

        // Five entries, one per target column, in target order.
        let entries = out.changelog.entries();
        assert_eq!(entries.len(), 5);
        for (entry, target) in entries.iter().zip(targets.iter()) {
            assert_eq!(&entry.target, target);
        }
        assert_eq!(entries[3].transforms, vec!["to-number", "scale x12"]);
    }

    #[test]
    fn test_mapping_is_deterministic() {
        let source = brazilian_source();
        let targets = english_targets();
        let catalog = scenario_catalog();
        let opts = MapperOptions::default();

        let a = map_table(&source, &targets, &catalog, &opts);
        let b = map_table(&source, &targets, &catalog, &opts);

        assert_eq!(a.table, b.table);
        assert_eq!(a.changelog.render(), b.changelog.render());
    }

    #[test]
    fn test_unmapped_target_fills_null() {
        let source = brazilian_source();
        let targets = vec!["Employee_Id".to_string()];
        let out = map_table(
            &source,
            &targets,
            &TransformCatalog::default(),
            &MapperOptions::default(),
        );

        assert_eq!(out.table.headers(), targets.as_slice());
        assert!(out.table.rows().iter().all(|r| r[0].is_null()));

        let entries = out.changelog.entries();
        assert_eq!(entries.len(), 1);
        assert!(entries[0].source.is_none());
        assert!(out.changelog.render().contains("unmapped"));
    }

    #[test]
    fn test_duplicate_source_headers_resolve_deterministically() {
        let mut source = Table::new(vec!["Code".to_string(), "Code".to_string()]);
        source.push_row(vec![
            Cell::Text("left".to_string()),
            Cell::Text("right".to_string()),
        ]);

        let targets = vec!["Code".to_string()];
        let out = map_table(
            &source,
            &targets,
            &TransformCatalog::default(),
            &MapperOptions::default(),
        );

        // First source column wins; the tie is logged, never fatal.
        assert_eq!(*out.table.cell(0, 0), Cell::Text("left".to_string()));
        let note = out.changelog.entries()[0].note.as_deref().unwrap();
        assert!(note.contains("ambiguous"));
        assert!(note.contains("first source column kept"));
    }

    #[test]
    fn test_heuristic_name_decomposition_without_catalog() {
        // No declared split rule at all: the full-name heuristic handles it.
        let source = brazilian_source();
        let targets = vec!["First_Name".to_string(), "Last_Name".to_string()];
        let out = map_table(
            &source,
            &targets,
            &TransformCatalog::default(),
            &MapperOptions::default(),
        );

        assert_eq!(*out.table.cell(0, 0), Cell::Text("João".to_string()));
        assert_eq!(*out.table.cell(0, 1), Cell::Text("Silva".to_string()));
    }

    #[test]
    fn test_unparseable_dates_null_and_counted() {
        let mut source = Table::new(vec!["Data Nasc.".to_string()]);
        source.push_row(vec![Cell::Text("1990-01-01".to_string())]);
        source.push_row(vec![Cell::Text("unknown".to_string())]);

        let targets = vec!["Birth_Date".to_string()];
        let out = map_table(
            &source,
            &targets,
            &TransformCatalog::default(),
            &MapperOptions::default(),
        );

        assert_eq!(
            *out.table.cell(0, 0),
            Cell::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap())
        );
        assert!(out.table.cell(1, 0).is_null());
        assert_eq!(out.changelog.entries()[0].null_count, 1);
    }

    #[test]
    fn test_output_columns_always_equal_targets() {
        // Source shape is irrelevant to the output schema.
        let mut source = Table::new(vec!["x".to_string()]);
        source.push_row(vec![Cell::Number(1.0)]);

        let targets = vec!["A".to_string(), "B".to_string(), "A".to_string()];
        let out = map_table(
            &source,
            &targets,
            &TransformCatalog::default(),
            &MapperOptions::default(),
        );

        assert_eq!(out.table.headers(), targets.as_slice());
        assert_eq!(out.table.rows()[0].len(), 3);
        assert_eq!(out.changelog.entries().len(), 3);
    }
}
