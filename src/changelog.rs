//! Change-log recorder: the audit trail of one mapping run.
//!
//! Entries accumulate in target-column order while the mapper works and the
//! log is immutable once handed back. `render` produces the flat report the
//! API returns as the request summary.

use serde::Serialize;

/// One record per target column describing what was mapped and how.
#[derive(Debug, Clone, Serialize)]
pub struct ChangeLogEntry {
    /// Target column name.
    pub target: String,
    /// Source column used, or `None` for an unmapped target.
    pub source: Option<String>,
    /// Labels of the transformations applied, in order.
    pub transforms: Vec<String>,
    /// Rows whose value fell back to null (unparseable or no source).
    pub null_count: usize,
    /// Rows whose category had no lookup entry and passed through.
    pub unmapped_categories: usize,
    /// Extra context: ambiguity resolution, heuristic decisions.
    pub note: Option<String>,
}

/// Append-only accumulator for one mapping run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ChangeLog {
    entries: Vec<ChangeLogEntry>,
    row_count: usize,
}

impl ChangeLog {
    pub fn new(row_count: usize) -> Self {
        Self {
            entries: Vec::new(),
            row_count,
        }
    }

    pub fn push(&mut self, entry: ChangeLogEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[ChangeLogEntry] {
        &self.entries
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Render the log as a flat human-readable report, one line per target
    /// column in target order.
    pub fn render(&self) -> String {
        let mut out = format!(
            "Mapped {} target column(s) over {} row(s):\n",
            self.entries.len(),
            self.row_count
        );
        for entry in &self.entries {
            out.push_str(&render_entry(entry));
            out.push('\n');
        }
        out
    }
}

fn render_entry(entry: &ChangeLogEntry) -> String {
    let mut line = match &entry.source {
        Some(source) => {
            let how = if entry.transforms.is_empty() {
                "copied as-is".to_string()
            } else {
                entry.transforms.join(", ")
            };
            format!("- {} <- \"{}\" ({})", entry.target, source, how)
        }
        None => format!("- {} <- none (unmapped, filled with null)", entry.target),
    };

    if entry.null_count > 0 && entry.source.is_some() {
        line.push_str(&format!("; {} value(s) fell back to null", entry.null_count));
    }
    if entry.unmapped_categories > 0 {
        line.push_str(&format!(
            "; {} unmapped categor{} passed through",
            entry.unmapped_categories,
            if entry.unmapped_categories == 1 { "y" } else { "ies" }
        ));
    }
    if let Some(note) = &entry.note {
        line.push_str(&format!(" [{}]", note));
    }
    line
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(target: &str, source: Option<&str>) -> ChangeLogEntry {
        ChangeLogEntry {
            target: target.to_string(),
            source: source.map(|s| s.to_string()),
            transforms: vec!["parse-date".to_string()],
            null_count: 0,
            unmapped_categories: 0,
            note: None,
        }
    }

    #[test]
    fn test_render_one_line_per_target() {
        let mut log = ChangeLog::new(3);
        log.push(entry("Birth_Date", Some("Data Nasc.")));
        log.push(entry("Employee_Id", None));

        let report = log.render();
        let lines: Vec<&str> = report.lines().collect();
        assert_eq!(lines.len(), 3); // header + 2 entries
        assert!(lines[1].contains("Birth_Date"));
        assert!(lines[1].contains("Data Nasc."));
        assert!(lines[2].contains("unmapped"));
    }

    #[test]
    fn test_render_counts_and_notes() {
        let mut e = entry("Dept_Code", Some("Departamento"));
        e.unmapped_categories = 2;
        e.note = Some("ambiguous with column 5; first match kept".to_string());

        let mut log = ChangeLog::new(10);
        log.push(e);
        let report = log.render();
        assert!(report.contains("2 unmapped categories"));
        assert!(report.contains("first match kept"));
    }

    #[test]
    fn test_entries_in_insertion_order() {
        let mut log = ChangeLog::new(0);
        log.push(entry("A", None));
        log.push(entry("B", None));
        assert_eq!(log.entries()[0].target, "A");
        assert_eq!(log.entries()[1].target, "B");
    }
}
