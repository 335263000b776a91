//! End-to-end restructure pipeline.
//!
//! One call takes a source file and a template file as raw uploads, maps
//! the source rows onto the template's column schema and leaves the
//! generated XLSX in the file store. Progress is streamed to the log
//! broadcaster; the caller gets the rendered change summary plus the
//! identifier to download the output under.

use crate::api::logs::{log_info, log_success, log_warning};
use crate::changelog::ChangeLog;
use crate::error::{PipelineError, PipelineResult};
use crate::mapper::{map_table, MapperOptions, TransformCatalog};
use crate::reader::read_table;
use crate::storage::FileStore;
use crate::writer::write_xlsx;

/// One uploaded file: raw bytes plus the client-supplied filename. The
/// filename only selects the parser, it is never used as a path.
#[derive(Debug, Clone, Copy)]
pub struct FileInput<'a> {
    pub filename: &'a str,
    pub bytes: &'a [u8],
}

/// Outcome of a successful restructure run.
#[derive(Debug)]
pub struct RestructureOutcome {
    /// Rendered change summary, one line per target column.
    pub summary: String,
    /// Identifier of the generated XLSX file in the store.
    pub file_id: String,
    /// Structured change log, for callers that want more than the text.
    pub changelog: ChangeLog,
}

/// Run the whole pipeline: read both files, map, serialize, store.
pub fn restructure(
    source: FileInput<'_>,
    template: FileInput<'_>,
    catalog: &TransformCatalog,
    opts: &MapperOptions,
    store: &dyn FileStore,
) -> PipelineResult<RestructureOutcome> {
    log_info(format!("reading source file \"{}\"", source.filename));
    let source_parsed = read_table(source.bytes, source.filename)?;
    if source_parsed.table.row_count() == 0 {
        return Err(PipelineError::EmptyInput);
    }
    log_info(format!(
        "source: {} column(s), {} row(s)",
        source_parsed.table.column_count(),
        source_parsed.table.row_count()
    ));

    // Only the template's header row matters; any body rows are ignored.
    log_info(format!("reading template file \"{}\"", template.filename));
    let template_parsed = read_table(template.bytes, template.filename)?;
    let targets = template_parsed.table.headers().to_vec();
    log_info(format!("template: {} target column(s)", targets.len()));

    let out = map_table(&source_parsed.table, &targets, catalog, opts);
    let unmapped = out
        .changelog
        .entries()
        .iter()
        .filter(|e| e.source.is_none())
        .count();
    if unmapped > 0 {
        log_warning(format!(
            "{} target column(s) had no usable source and were filled with null",
            unmapped
        ));
    }

    let bytes = write_xlsx(&out.table)?;
    let file_id = store.put(&bytes, "xlsx")?;
    log_success(format!(
        "generated {} ({} row(s))",
        file_id,
        out.table.row_count()
    ));

    Ok(RestructureOutcome {
        summary: out.changelog.render(),
        file_id,
        changelog: out.changelog,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mapper::example_catalog;
    use crate::storage::DiskStore;
    use std::time::Duration;
    use tempfile::tempdir;

    fn store() -> (tempfile::TempDir, DiskStore) {
        let dir = tempdir().unwrap();
        let store = DiskStore::new(dir.path(), Duration::from_secs(3600)).unwrap();
        (dir, store)
    }

    #[test]
    fn test_full_run_stores_output() {
        let source = b"Nome Completo,Data Nasc.,Sal\xc3\xa1rio Bruto\nJo\xc3\xa3o Silva,1990-01-01,5000\n";
        let template = b"First_Name,Last_Name,Birth_Date,Annual_Salary\n";
        let (_dir, store) = store();

        let outcome = restructure(
            FileInput {
                filename: "funcionarios.csv",
                bytes: source,
            },
            FileInput {
                filename: "template.csv",
                bytes: template,
            },
            &example_catalog(),
            &MapperOptions::default(),
            &store,
        )
        .unwrap();

        assert!(outcome.file_id.ends_with(".xlsx"));
        assert!(outcome.summary.contains("First_Name"));
        assert_eq!(outcome.changelog.entries().len(), 4);

        // The stored bytes parse back as the restructured table.
        let stored = store.get(&outcome.file_id).unwrap();
        let parsed = read_table(&stored.bytes, &stored.filename).unwrap();
        assert_eq!(
            parsed.table.headers(),
            &["First_Name", "Last_Name", "Birth_Date", "Annual_Salary"]
        );
        assert_eq!(parsed.table.row_count(), 1);
    }

    #[test]
    fn test_empty_source_is_rejected() {
        let (_dir, store) = store();
        let err = restructure(
            FileInput {
                filename: "empty.csv",
                bytes: b"Nome,Idade\n",
            },
            FileInput {
                filename: "template.csv",
                bytes: b"Name,Age\n",
            },
            &example_catalog(),
            &MapperOptions::default(),
            &store,
        )
        .unwrap_err();
        assert!(matches!(err, PipelineError::EmptyInput));
    }

    #[test]
    fn test_template_body_rows_are_ignored() {
        let (_dir, store) = store();
        let outcome = restructure(
            FileInput {
                filename: "s.csv",
                bytes: b"Name\nAda\n",
            },
            FileInput {
                filename: "t.csv",
                bytes: b"Name\nplaceholder\nrows\n",
            },
            &example_catalog(),
            &MapperOptions::default(),
            &store,
        )
        .unwrap();

        let stored = store.get(&outcome.file_id).unwrap();
        let parsed = read_table(&stored.bytes, &stored.filename).unwrap();
        assert_eq!(parsed.table.row_count(), 1);
    }

    #[test]
    fn test_unsupported_source_format_propagates() {
        let (_dir, store) = store();
        let err = restructure(
            FileInput {
                filename: "notes.txt",
                bytes: b"whatever",
            },
            FileInput {
                filename: "t.csv",
                bytes: b"Name\n",
            },
            &example_catalog(),
            &MapperOptions::default(),
            &store,
        )
        .unwrap_err();
        assert!(err.to_string().contains("notes.txt"));
    }
}
