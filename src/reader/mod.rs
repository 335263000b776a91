//! Tabular file reader with encoding and delimiter auto-detection.
//!
//! Turns raw bytes plus a filename into a [`Table`]. The filename is used
//! only to pick a parser: `.csv`/`.tsv` go through the CSV path,
//! `.xls`/`.xlsx` through the spreadsheet path. Anything else is
//! [`ReadError::UnsupportedFormat`].

use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::{ReadError, ReadResult};
use crate::table::{Cell, Table};

/// Detected input format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    Csv,
    Tsv,
    Xlsx,
}

impl FileFormat {
    /// Pick a format from the filename extension.
    pub fn from_filename(filename: &str) -> ReadResult<Self> {
        let ext = Path::new(filename)
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_default();

        match ext.as_str() {
            "csv" => Ok(FileFormat::Csv),
            "tsv" => Ok(FileFormat::Tsv),
            "xls" | "xlsx" => Ok(FileFormat::Xlsx),
            _ => Err(ReadError::UnsupportedFormat(filename.to_string())),
        }
    }
}

/// A parsed file with detection metadata for diagnostics.
#[derive(Debug, Clone)]
pub struct ParsedFile {
    /// The parsed table.
    pub table: Table,
    /// Format the parser was picked for.
    pub format: FileFormat,
    /// Detected text encoding (CSV only).
    pub encoding: Option<String>,
    /// Detected delimiter (CSV only).
    pub delimiter: Option<char>,
}

/// Parse raw bytes into a table, picking the parser from the filename.
pub fn read_table(bytes: &[u8], filename: &str) -> ReadResult<ParsedFile> {
    if bytes.is_empty() {
        return Err(ReadError::EmptyFile);
    }
    match FileFormat::from_filename(filename)? {
        FileFormat::Csv => read_csv(bytes, None),
        FileFormat::Tsv => read_csv(bytes, Some('\t')),
        FileFormat::Xlsx => read_xlsx(bytes),
    }
}

// =============================================================================
// CSV
// =============================================================================

/// Detect the encoding of raw bytes using chardet.
pub fn detect_encoding(bytes: &[u8]) -> String {
    let result = chardet::detect(bytes);
    let charset = result.0;

    // Normalize charset names
    match charset.to_lowercase().as_str() {
        "ascii" | "utf-8" | "utf8" => "utf-8".to_string(),
        "iso-8859-1" | "iso-8859-15" | "latin-1" | "latin1" => "iso-8859-1".to_string(),
        "windows-1252" | "cp1252" => "windows-1252".to_string(),
        _ => charset,
    }
}

/// Decode bytes to string using the specified encoding.
pub fn decode_content(bytes: &[u8], encoding: &str) -> ReadResult<String> {
    let decoded = match encoding.to_lowercase().as_str() {
        "utf-8" | "utf8" | "ascii" => String::from_utf8_lossy(bytes).to_string(),
        "iso-8859-1" | "latin-1" | "latin1" => {
            encoding_rs::ISO_8859_15.decode(bytes).0.to_string()
        }
        "windows-1252" | "cp1252" => encoding_rs::WINDOWS_1252.decode(bytes).0.to_string(),
        _ => String::from_utf8_lossy(bytes).to_string(),
    };

    // A text file should not contain NUL bytes; their presence means we were
    // handed unreadable binary under a .csv name.
    if decoded.contains('\0') {
        return Err(ReadError::EncodingError(
            "content contains NUL bytes (binary file?)".to_string(),
        ));
    }
    Ok(decoded)
}

/// Detect the delimiter by counting occurrences in the first line.
pub fn detect_delimiter(content: &str) -> char {
    let first_line = content.lines().next().unwrap_or("");

    let separators = [';', ',', '\t', '|'];
    let mut best_sep = ',';
    let mut best_count = 0;

    for &sep in &separators {
        let count = first_line.matches(sep).count();
        if count > best_count {
            best_count = count;
            best_sep = sep;
        }
    }

    best_sep
}

/// Parse CSV bytes, auto-detecting encoding and (unless given) delimiter.
pub fn read_csv(bytes: &[u8], delimiter: Option<char>) -> ReadResult<ParsedFile> {
    let encoding = detect_encoding(bytes);
    let content = decode_content(bytes, &encoding)?;

    if content.trim().is_empty() {
        return Err(ReadError::EmptyFile);
    }

    let delimiter = delimiter.unwrap_or_else(|| detect_delimiter(&content));
    let format = if delimiter == '\t' {
        FileFormat::Tsv
    } else {
        FileFormat::Csv
    };

    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter as u8)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| ReadError::ParseError(e.to_string()))?
        .iter()
        .map(|h| h.to_string())
        .collect();

    if headers.is_empty() || headers.iter().all(|h| h.is_empty()) {
        return Err(ReadError::NoHeaders);
    }

    let mut table = Table::new(headers);
    for (idx, record) in reader.records().enumerate() {
        // The csv crate reports ragged rows as errors; surface them with the
        // 1-based data line number.
        let record = record.map_err(|e| {
            ReadError::ParseError(format!("line {}: {}", idx + 2, e))
        })?;
        let row: Vec<Cell> = record.iter().map(Cell::from_raw).collect();
        table.push_row(row);
    }

    Ok(ParsedFile {
        table,
        format,
        encoding: Some(encoding),
        delimiter: Some(delimiter),
    })
}

// =============================================================================
// XLSX
// =============================================================================

/// Parse spreadsheet bytes (.xls or .xlsx) via calamine.
///
/// Only the first worksheet is read; the first row is the header row.
pub fn read_xlsx(bytes: &[u8]) -> ReadResult<ParsedFile> {
    let cursor = Cursor::new(bytes.to_vec());
    let mut workbook = open_workbook_auto_from_rs(cursor)
        .map_err(|e| ReadError::ParseError(format!("cannot open workbook: {}", e)))?;

    let range = workbook
        .worksheet_range_at(0)
        .ok_or(ReadError::EmptyFile)?
        .map_err(|e| ReadError::ParseError(format!("cannot read worksheet: {}", e)))?;

    let mut rows = range.rows();
    let header_row = rows.next().ok_or(ReadError::NoHeaders)?;

    let headers: Vec<String> = header_row.iter().map(data_to_header).collect();
    if headers.iter().all(|h| h.is_empty()) {
        return Err(ReadError::NoHeaders);
    }

    let mut table = Table::new(headers);
    // Blank rows inside the data are kept as all-null rows; only the ones
    // trailing the last non-empty row are dropped, a common artifact of
    // hand-edited spreadsheets. Buffer blanks until the next non-empty row
    // decides their fate.
    let mut pending_blank = 0usize;
    for row in rows {
        let cells: Vec<Cell> = row.iter().map(data_to_cell).collect();
        if cells.iter().all(|c| c.is_null()) {
            pending_blank += 1;
            continue;
        }
        for _ in 0..pending_blank {
            table.push_row(Vec::new());
        }
        pending_blank = 0;
        table.push_row(cells);
    }

    Ok(ParsedFile {
        table,
        format: FileFormat::Xlsx,
        encoding: None,
        delimiter: None,
    })
}

fn data_to_header(data: &Data) -> String {
    match data {
        Data::String(s) => s.trim().to_string(),
        Data::Empty => String::new(),
        other => other.to_string().trim().to_string(),
    }
}

fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Null,
        Data::String(s) => Cell::from_raw(s),
        Data::Float(n) => Cell::Number(*n),
        Data::Int(n) => Cell::Number(*n as f64),
        Data::Bool(b) => Cell::Bool(*b),
        Data::DateTime(dt) => dt
            .as_datetime()
            .map(|ndt| Cell::Date(ndt.date()))
            .unwrap_or(Cell::Null),
        Data::DateTimeIso(s) => crate::table::parse_date(&s[..s.len().min(10)])
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::Text(s.clone())),
        Data::DurationIso(s) => Cell::Text(s.clone()),
        Data::Error(_) => Cell::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_simple_csv() {
        let csv = b"name,age\nAlice,30\nBob,25";
        let parsed = read_table(csv, "people.csv").unwrap();

        assert_eq!(parsed.table.row_count(), 2);
        assert_eq!(parsed.table.column_count(), 2);
        assert_eq!(parsed.table.headers(), &["name", "age"]);
        assert_eq!(*parsed.table.cell(0, 0), Cell::Text("Alice".to_string()));
        assert_eq!(*parsed.table.cell(1, 1), Cell::Number(25.0));
    }

    #[test]
    fn test_semicolon_autodetect() {
        let csv = b"a;b;c\n1;2;3";
        let parsed = read_table(csv, "data.csv").unwrap();

        assert_eq!(parsed.delimiter, Some(';'));
        assert_eq!(parsed.table.column_count(), 3);
    }

    #[test]
    fn test_quoted_values() {
        let csv = b"name,note\n\"Silva, Joao\",\"says \"\"hi\"\"\"";
        let parsed = read_table(csv, "x.csv").unwrap();

        assert_eq!(
            *parsed.table.cell(0, 0),
            Cell::Text("Silva, Joao".to_string())
        );
        assert_eq!(
            *parsed.table.cell(0, 1),
            Cell::Text("says \"hi\"".to_string())
        );
    }

    #[test]
    fn test_date_and_null_typing() {
        let csv = b"born,dept\n1990-01-01,\n15/02/1985,TI";
        let parsed = read_table(csv, "x.csv").unwrap();

        assert_eq!(
            *parsed.table.cell(0, 0),
            Cell::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap())
        );
        assert_eq!(*parsed.table.cell(0, 1), Cell::Null);
        assert_eq!(
            *parsed.table.cell(1, 0),
            Cell::Date(NaiveDate::from_ymd_opt(1985, 2, 15).unwrap())
        );
    }

    #[test]
    fn test_unsupported_format() {
        let result = read_table(b"hello", "notes.txt");
        assert!(matches!(result, Err(ReadError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_empty_file() {
        let result = read_table(b"", "empty.csv");
        assert!(matches!(result, Err(ReadError::EmptyFile)));
    }

    #[test]
    fn test_ragged_rows_are_parse_errors() {
        let csv = b"a,b\n1,2,3";
        let result = read_table(csv, "bad.csv");
        assert!(matches!(result, Err(ReadError::ParseError(_))));
    }

    #[test]
    fn test_binary_under_csv_name() {
        let bytes = [0x00u8, 0x01, 0x02, 0x00, 0xff];
        let result = read_table(&bytes, "fake.csv");
        assert!(result.is_err());
    }

    #[test]
    fn test_latin1_decoding() {
        // "Salário" in ISO-8859-1
        let bytes: &[u8] = &[
            b'S', b'a', b'l', 0xE1, b'r', b'i', b'o', b'\n', b'x',
        ];
        let parsed = read_table(bytes, "s.csv").unwrap();
        assert!(parsed.table.headers()[0].contains("Sal"));
    }

    #[test]
    fn test_tsv_extension_forces_tab() {
        let tsv = b"a\tb\n1\t2";
        let parsed = read_table(tsv, "data.tsv").unwrap();
        assert_eq!(parsed.delimiter, Some('\t'));
        assert_eq!(parsed.table.column_count(), 2);
    }

    #[test]
    fn test_xlsx_interior_blank_row_kept() {
        use crate::writer::write_xlsx;

        let mut table = Table::new(vec!["name".to_string()]);
        table.push_row(vec![Cell::Text("Alice".to_string())]);
        table.push_row(vec![Cell::Null]);
        table.push_row(vec![Cell::Text("Bob".to_string())]);
        table.push_row(vec![Cell::Null]);

        let bytes = write_xlsx(&table).unwrap();
        let parsed = read_table(&bytes, "o.xlsx").unwrap();

        // A blank separator row stays as an all-null row; only the trailing
        // blank is dropped.
        assert_eq!(parsed.table.row_count(), 3);
        assert_eq!(*parsed.table.cell(0, 0), Cell::Text("Alice".to_string()));
        assert!(parsed.table.cell(1, 0).is_null());
        assert_eq!(*parsed.table.cell(2, 0), Cell::Text("Bob".to_string()));
    }

    #[test]
    fn test_xlsx_round_trip_via_writer() {
        use crate::writer::write_xlsx;

        let mut table = Table::new(vec!["name".to_string(), "n".to_string()]);
        table.push_row(vec![Cell::Text("Ana".to_string()), Cell::Number(7.0)]);

        let bytes = write_xlsx(&table).unwrap();
        let parsed = read_table(&bytes, "out.xlsx").unwrap();

        assert_eq!(parsed.table.headers(), table.headers());
        assert_eq!(parsed.table.row_count(), 1);
        assert_eq!(*parsed.table.cell(0, 0), Cell::Text("Ana".to_string()));
        assert_eq!(*parsed.table.cell(0, 1), Cell::Number(7.0));
    }
}
