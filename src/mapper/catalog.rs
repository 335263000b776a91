//! Declared transformation catalog.
//!
//! Scale factors, categorical lookup tables and name-split rules are
//! supplied per deployment, never inferred: a silent unit conversion is
//! data corruption. The catalog is loaded once at startup and shared
//! read-only with every request.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use super::similarity::{normalize_key, NamePart};

/// A complete transformation catalog.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TransformCatalog {
    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Declared numeric scale rules, e.g. monthly -> annual salary.
    #[serde(default)]
    pub scales: Vec<ScaleRule>,

    /// Declared categorical lookup tables.
    #[serde(default)]
    pub lookups: Vec<LookupRule>,

    /// Declared name-split rules.
    #[serde(default)]
    pub splits: Vec<SplitRule>,
}

/// Multiply a numeric target column by a fixed factor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScaleRule {
    /// Target column this rule applies to (matched case/diacritic-insensitively).
    pub target: String,
    /// Multiplication factor.
    pub factor: f64,
    /// Why this rule exists, for the change log.
    #[serde(default)]
    pub reason: String,
}

/// Map free-text categories onto fixed codes for one target column.
/// Unmapped categories pass through unchanged and are counted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LookupRule {
    /// Target column this table applies to.
    pub target: String,
    /// Free text -> code.
    pub mapping: HashMap<String, String>,
    #[serde(default = "default_case_insensitive")]
    pub case_insensitive: bool,
}

fn default_case_insensitive() -> bool {
    true
}

/// Split one source column's value across first-name / last-name targets.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SplitRule {
    /// Source column holding the full name.
    pub source: String,
    /// Targets receiving the first whitespace token.
    #[serde(default)]
    pub first_targets: Vec<String>,
    /// Targets receiving the remainder.
    #[serde(default)]
    pub last_targets: Vec<String>,
}

impl TransformCatalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Declared scale factor for a target column, if any.
    pub fn scale_for(&self, target: &str) -> Option<&ScaleRule> {
        let key = normalize_key(target);
        self.scales.iter().find(|r| normalize_key(&r.target) == key)
    }

    /// Declared lookup table for a target column, if any.
    pub fn lookup_for(&self, target: &str) -> Option<&LookupRule> {
        let key = normalize_key(target);
        self.lookups.iter().find(|r| normalize_key(&r.target) == key)
    }

    /// Declared split rule claiming a target column, if any.
    ///
    /// Rules are checked in registration order; when more than one could
    /// apply, the earliest-registered wins.
    pub fn split_for(&self, target: &str) -> Option<(&SplitRule, NamePart)> {
        let key = normalize_key(target);
        for rule in &self.splits {
            if rule.first_targets.iter().any(|t| normalize_key(t) == key) {
                return Some((rule, NamePart::First));
            }
            if rule.last_targets.iter().any(|t| normalize_key(t) == key) {
                return Some((rule, NamePart::Rest));
            }
        }
        None
    }

    /// Structural problems that must fail startup, before any request is
    /// accepted.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut problems = Vec::new();

        for rule in &self.scales {
            if !rule.factor.is_finite() || rule.factor == 0.0 {
                problems.push(format!(
                    "scale rule for '{}' has invalid factor {}",
                    rule.target, rule.factor
                ));
            }
        }
        for rule in &self.lookups {
            if rule.mapping.is_empty() {
                problems.push(format!("lookup rule for '{}' has an empty table", rule.target));
            }
        }
        for rule in &self.splits {
            if rule.first_targets.is_empty() && rule.last_targets.is_empty() {
                problems.push(format!("split rule for '{}' names no targets", rule.source));
            }
        }

        if problems.is_empty() {
            Ok(())
        } else {
            Err(problems)
        }
    }
}

/// Example catalog for documentation and tests: monthly salary to annual,
/// full-name split, department lookup.
pub fn example_catalog() -> TransformCatalog {
    let mut dept = HashMap::new();
    dept.insert("Tecnologia da Informação".to_string(), "TI".to_string());
    dept.insert("Recursos Humanos".to_string(), "RH".to_string());

    TransformCatalog {
        description: "Example catalog: Brazilian HR export to English template".to_string(),
        scales: vec![ScaleRule {
            target: "Annual_Salary".to_string(),
            factor: 12.0,
            reason: "source reports monthly gross salary".to_string(),
        }],
        lookups: vec![LookupRule {
            target: "Dept_Code".to_string(),
            mapping: dept,
            case_insensitive: true,
        }],
        splits: vec![SplitRule {
            source: "Nome Completo".to_string(),
            first_targets: vec!["First_Name".to_string()],
            last_targets: vec!["Last_Name".to_string()],
        }],
    }
}
