//! Table writer: serialize an output table to spreadsheet bytes.
//!
//! The header row is the table's headers in order, one data row per table
//! row, with declared types preserved (dates as date cells, numbers as
//! numeric cells). Columns are never dropped or reordered. A value that
//! cannot be represented in its cell type degrades to its textual
//! rendering; only structural failures abort the request.

use rust_xlsxwriter::{ExcelDateTime, Format, Workbook};

use crate::error::{WriteError, WriteResult};
use crate::table::{Cell, Table};

/// Content type of generated XLSX files, as served on download.
pub const XLSX_CONTENT_TYPE: &str =
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet";

/// Serialize a table to XLSX bytes.
pub fn write_xlsx(table: &Table) -> WriteResult<Vec<u8>> {
    let mut workbook = Workbook::new();
    let worksheet = workbook.add_worksheet();
    let date_format = Format::new().set_num_format("yyyy-mm-dd");

    for (col, header) in table.headers().iter().enumerate() {
        worksheet
            .write_string(0, col as u16, header)
            .map_err(|e| WriteError::SerializationError(e.to_string()))?;
    }

    for (row_idx, row) in table.rows().iter().enumerate() {
        let row_num = (row_idx + 1) as u32;
        for (col, cell) in row.iter().enumerate() {
            let col_num = col as u16;
            let result = match cell {
                Cell::Null => Ok(()),
                Cell::Text(s) => worksheet
                    .write_string(row_num, col_num, s)
                    .map(|_| ()),
                Cell::Number(n) if n.is_finite() => worksheet
                    .write_number(row_num, col_num, *n)
                    .map(|_| ()),
                // Non-finite numbers have no numeric cell representation.
                Cell::Number(_) => worksheet
                    .write_string(row_num, col_num, &cell.display())
                    .map(|_| ()),
                Cell::Bool(b) => worksheet
                    .write_boolean(row_num, col_num, *b)
                    .map(|_| ()),
                Cell::Date(d) => write_date(worksheet, row_num, col_num, d, &date_format),
            };

            // Cell-level degrade: fall back to the textual rendering rather
            // than aborting the whole file.
            if result.is_err() {
                worksheet
                    .write_string(row_num, col_num, &cell.display())
                    .map_err(|e| WriteError::SerializationError(e.to_string()))?;
            }
        }
    }

    workbook
        .save_to_buffer()
        .map_err(|e| WriteError::SerializationError(e.to_string()))
}

fn write_date(
    worksheet: &mut rust_xlsxwriter::Worksheet,
    row: u32,
    col: u16,
    date: &chrono::NaiveDate,
    format: &Format,
) -> Result<(), rust_xlsxwriter::XlsxError> {
    use chrono::Datelike;
    let excel_date = ExcelDateTime::from_ymd(
        date.year() as u16,
        date.month() as u8,
        date.day() as u8,
    )?;
    worksheet
        .write_datetime_with_format(row, col, excel_date, format)
        .map(|_| ())
}

/// Serialize a table to CSV bytes (UTF-8, comma-delimited).
pub fn write_csv(table: &Table) -> WriteResult<Vec<u8>> {
    let mut writer = csv::Writer::from_writer(Vec::new());

    writer
        .write_record(table.headers())
        .map_err(|e| WriteError::SerializationError(e.to_string()))?;

    for row in table.rows() {
        let record: Vec<String> = row.iter().map(Cell::display).collect();
        writer
            .write_record(&record)
            .map_err(|e| WriteError::SerializationError(e.to_string()))?;
    }

    writer
        .into_inner()
        .map_err(|e| WriteError::SerializationError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reader::read_table;
    use chrono::NaiveDate;

    fn typed_table() -> Table {
        let mut t = Table::new(vec![
            "name".to_string(),
            "born".to_string(),
            "salary".to_string(),
            "active".to_string(),
        ]);
        t.push_row(vec![
            Cell::Text("João".to_string()),
            Cell::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap()),
            Cell::Number(60000.0),
            Cell::Bool(true),
        ]);
        t.push_row(vec![Cell::Null, Cell::Null, Cell::Null, Cell::Null]);
        t
    }

    #[test]
    fn test_xlsx_round_trip() {
        let table = typed_table();
        let bytes = write_xlsx(&table).unwrap();
        let parsed = read_table(&bytes, "out.xlsx").unwrap();

        assert_eq!(parsed.table.headers(), table.headers());
        assert_eq!(parsed.table.row_count(), 1); // all-null row skipped on read
        assert_eq!(*parsed.table.cell(0, 0), Cell::Text("João".to_string()));
        assert_eq!(
            *parsed.table.cell(0, 1),
            Cell::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap())
        );
        assert_eq!(*parsed.table.cell(0, 2), Cell::Number(60000.0));
        assert_eq!(*parsed.table.cell(0, 3), Cell::Bool(true));
    }

    #[test]
    fn test_csv_round_trip() {
        let table = typed_table();
        let bytes = write_csv(&table).unwrap();
        let parsed = read_table(&bytes, "out.csv").unwrap();

        assert_eq!(parsed.table.headers(), table.headers());
        assert_eq!(*parsed.table.cell(0, 2), Cell::Number(60000.0));
        assert_eq!(
            *parsed.table.cell(0, 1),
            Cell::Date(NaiveDate::from_ymd_opt(1990, 1, 1).unwrap())
        );
    }

    #[test]
    fn test_nan_degrades_to_text() {
        let mut t = Table::new(vec!["n".to_string()]);
        t.push_row(vec![Cell::Number(f64::NAN)]);

        // Must not abort; the cell degrades to text.
        let bytes = write_xlsx(&t).unwrap();
        assert!(!bytes.is_empty());
    }

    #[test]
    fn test_column_order_preserved() {
        let mut t = Table::new(vec!["z".to_string(), "a".to_string(), "m".to_string()]);
        t.push_row(vec![
            Cell::Number(1.0),
            Cell::Number(2.0),
            Cell::Number(3.0),
        ]);

        let bytes = write_xlsx(&t).unwrap();
        let parsed = read_table(&bytes, "o.xlsx").unwrap();
        assert_eq!(parsed.table.headers(), &["z", "a", "m"]);
    }

    #[test]
    fn test_pre_epoch_date_degrades() {
        let mut t = Table::new(vec!["d".to_string()]);
        t.push_row(vec![Cell::Date(
            NaiveDate::from_ymd_opt(1850, 6, 1).unwrap(),
        )]);

        // Excel serial dates start in 1900; the cell falls back to ISO text.
        let bytes = write_xlsx(&t).unwrap();
        let parsed = read_table(&bytes, "o.xlsx").unwrap();
        assert_eq!(
            *parsed.table.cell(0, 0),
            Cell::Date(NaiveDate::from_ymd_opt(1850, 6, 1).unwrap())
        );
    }
}
