//! Header and value-shape similarity scoring.
//!
//! Column matching is two-part: normalized token overlap between header
//! names, and agreement between the source column's sampled value shape and
//! the type its target header name implies. Both parts are deterministic.

use crate::table::{CellType, ColumnProfile};

/// Weight of name similarity vs value-shape similarity in the final score.
const NAME_WEIGHT: f64 = 0.6;
const SHAPE_WEIGHT: f64 = 0.4;

/// Credit for a prefix match between tokens ("dept" vs "department").
const PREFIX_CREDIT: f64 = 0.8;

/// Minimum token length for prefix matching, to keep "a"/"ab" from matching.
const PREFIX_MIN_LEN: usize = 3;

// =============================================================================
// Normalization
// =============================================================================

/// Split a header into normalized tokens: lowercase, diacritics folded,
/// punctuation-separated, common Portuguese terms folded to English.
pub fn tokenize(header: &str) -> Vec<String> {
    header
        .chars()
        .map(fold_diacritic)
        .collect::<String>()
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(|t| synonym(t).to_string())
        .collect()
}

/// Canonical key for a header: its normalized tokens joined with `_`.
/// Used wherever two header spellings must compare equal.
pub fn normalize_key(header: &str) -> String {
    tokenize(header).join("_")
}

/// Fold common Latin diacritics to their base letter.
fn fold_diacritic(c: char) -> char {
    match c {
        'á' | 'à' | 'â' | 'ã' | 'ä' | 'Á' | 'À' | 'Â' | 'Ã' | 'Ä' => 'a',
        'é' | 'è' | 'ê' | 'ë' | 'É' | 'È' | 'Ê' | 'Ë' => 'e',
        'í' | 'ì' | 'î' | 'ï' | 'Í' | 'Ì' | 'Î' | 'Ï' => 'i',
        'ó' | 'ò' | 'ô' | 'õ' | 'ö' | 'Ó' | 'Ò' | 'Ô' | 'Õ' | 'Ö' => 'o',
        'ú' | 'ù' | 'û' | 'ü' | 'Ú' | 'Ù' | 'Û' | 'Ü' => 'u',
        'ç' | 'Ç' => 'c',
        'ñ' | 'Ñ' => 'n',
        _ => c,
    }
}

/// Fold common Portuguese/Spanish header terms onto their English
/// equivalents so cross-language schemas score sensibly.
fn synonym(token: &str) -> &str {
    match token {
        "nome" | "nombre" | "nom" => "name",
        "completo" | "complet" | "completa" => "full",
        "sobrenome" | "apellido" => "surname",
        "primeiro" | "primer" => "first",
        "ultimo" | "ultima" => "last",
        "data" | "fecha" => "date",
        "nasc" | "nascimento" | "nacimiento" => "birth",
        "salario" => "salary",
        "bruto" => "gross",
        "liquido" => "net",
        "anual" => "annual",
        "mensal" | "mensual" => "monthly",
        "departamento" | "depto" | "department" => "dept",
        "codigo" => "code",
        "valor" => "amount",
        "preco" | "precio" => "price",
        "cidade" | "ciudad" => "city",
        "estado" => "state",
        "telefone" | "telefono" => "phone",
        "endereco" | "direccion" => "address",
        "idade" | "edad" => "age",
        other => other,
    }
}

// =============================================================================
// Name similarity
// =============================================================================

fn token_match(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.len() >= PREFIX_MIN_LEN
        && b.len() >= PREFIX_MIN_LEN
        && (a.starts_with(b) || b.starts_with(a))
    {
        return PREFIX_CREDIT;
    }
    0.0
}

/// Token-overlap similarity between two token lists, in `[0, 1]`.
///
/// Each target token is credited with its best source-token match; the sum
/// is normalized by the longer list so extra unmatched tokens dilute.
pub fn name_similarity(target: &[String], source: &[String]) -> f64 {
    if target.is_empty() || source.is_empty() {
        return 0.0;
    }
    let matched: f64 = target
        .iter()
        .map(|t| {
            source
                .iter()
                .map(|s| token_match(t, s))
                .fold(0.0, f64::max)
        })
        .sum();
    matched / target.len().max(source.len()) as f64
}

// =============================================================================
// Value shape
// =============================================================================

/// The cell type a target header name implies.
pub fn expected_type(target_tokens: &[String]) -> CellType {
    const DATE_HINTS: &[&str] = &[
        "date", "birth", "dob", "created", "updated", "hired", "admission",
    ];
    const NUMBER_HINTS: &[&str] = &[
        "salary", "amount", "price", "total", "quantity", "qty", "count",
        "age", "weight", "height", "score",
    ];
    const BOOL_HINTS: &[&str] = &["flag", "active", "enabled", "is"];

    for t in target_tokens {
        if DATE_HINTS.contains(&t.as_str()) {
            return CellType::Date;
        }
    }
    for t in target_tokens {
        if NUMBER_HINTS.contains(&t.as_str()) {
            return CellType::Number;
        }
    }
    for t in target_tokens {
        if BOOL_HINTS.contains(&t.as_str()) {
            return CellType::Bool;
        }
    }
    CellType::Text
}

/// Agreement between the expected target type and a column's inferred type.
pub fn shape_score(expected: CellType, inferred: CellType) -> f64 {
    if expected == inferred {
        return 1.0;
    }
    match (expected, inferred) {
        // An all-null column tells us nothing either way.
        (_, CellType::Null) => 0.5,
        // Anything renders as text.
        (CellType::Text, _) => 0.5,
        // Dates and numbers sometimes arrive as unparsed text.
        (CellType::Date, CellType::Text) => 0.2,
        (CellType::Number, CellType::Text) => 0.2,
        _ => 0.0,
    }
}

/// Combined score of a source column as a candidate for a target header.
pub fn candidate_score(
    target_tokens: &[String],
    expected: CellType,
    profile: &ColumnProfile,
) -> f64 {
    let source_tokens = tokenize(&profile.name);
    let name = name_similarity(target_tokens, &source_tokens);
    let shape = shape_score(expected, profile.inferred);
    NAME_WEIGHT * name + SHAPE_WEIGHT * shape
}

/// Whether a source column looks like a full personal name: name-ish header
/// plus multi-word text samples.
pub fn looks_like_full_name(profile: &ColumnProfile) -> bool {
    let tokens = tokenize(&profile.name);
    let name_header = tokens.iter().any(|t| t == "name" || t == "full");
    if !name_header {
        return false;
    }
    let mut text_samples = 0usize;
    let mut multiword = 0usize;
    for cell in &profile.samples {
        if let crate::table::Cell::Text(s) = cell {
            text_samples += 1;
            if s.trim().contains(char::is_whitespace) {
                multiword += 1;
            }
        }
    }
    tokens.iter().any(|t| t == "full") || (text_samples > 0 && multiword * 2 >= text_samples)
}

/// Which part of a split name a target header asks for, if any.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamePart {
    First,
    Rest,
}

/// Detect first-name / last-name targets.
pub fn name_part(target_tokens: &[String]) -> Option<NamePart> {
    const FIRST: &[&str] = &["first", "given", "forename"];
    const LAST: &[&str] = &["last", "surname", "family"];

    if target_tokens.iter().any(|t| FIRST.contains(&t.as_str())) {
        Some(NamePart::First)
    } else if target_tokens.iter().any(|t| LAST.contains(&t.as_str())) {
        Some(NamePart::Rest)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Cell;

    #[test]
    fn test_tokenize_folds_diacritics_and_synonyms() {
        assert_eq!(tokenize("Salário Bruto"), vec!["salary", "gross"]);
        assert_eq!(tokenize("Data Nasc."), vec!["date", "birth"]);
        assert_eq!(tokenize("Nome Completo"), vec!["name", "full"]);
        assert_eq!(tokenize("First_Name"), vec!["first", "name"]);
    }

    #[test]
    fn test_normalize_key_equates_spellings() {
        assert_eq!(normalize_key("Annual Salary"), normalize_key("annual_SALARY"));
        assert_eq!(normalize_key("Salário"), "salary");
    }

    #[test]
    fn test_name_similarity_exact_and_prefix() {
        let birth = tokenize("Birth_Date");
        let data_nasc = tokenize("Data Nasc.");
        assert!((name_similarity(&birth, &data_nasc) - 1.0).abs() < 1e-9);

        let dept = tokenize("Dept_Code");
        let departamento = tokenize("Departamento");
        // "dept" matches, "code" has no counterpart.
        assert!(name_similarity(&dept, &departamento) >= 0.4);

        let unrelated = tokenize("Employee_Id");
        assert_eq!(name_similarity(&unrelated, &data_nasc), 0.0);
    }

    #[test]
    fn test_expected_type_from_header() {
        assert_eq!(expected_type(&tokenize("Birth_Date")), CellType::Date);
        assert_eq!(expected_type(&tokenize("Annual_Salary")), CellType::Number);
        assert_eq!(expected_type(&tokenize("Dept_Code")), CellType::Text);
    }

    #[test]
    fn test_name_part_detection() {
        assert_eq!(name_part(&tokenize("First_Name")), Some(NamePart::First));
        assert_eq!(name_part(&tokenize("Last_Name")), Some(NamePart::Rest));
        assert_eq!(name_part(&tokenize("Sobrenome")), Some(NamePart::Rest));
        assert_eq!(name_part(&tokenize("Dept_Code")), None);
    }

    #[test]
    fn test_full_name_detection() {
        let profile = ColumnProfile {
            name: "Nome Completo".to_string(),
            index: 0,
            inferred: CellType::Text,
            samples: vec![Cell::Text("João Silva".to_string())],
            null_ratio: 0.0,
        };
        assert!(looks_like_full_name(&profile));

        let not_name = ColumnProfile {
            name: "Departamento".to_string(),
            inferred: CellType::Text,
            samples: vec![Cell::Text("TI".to_string())],
            index: 3,
            null_ratio: 0.0,
        };
        assert!(!looks_like_full_name(&not_name));
    }
}
