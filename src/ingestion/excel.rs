#![cfg(feature = "excel")]

use std::fs;
use std::io::Cursor;
use std::path::Path;

use calamine::{open_workbook_auto_from_rs, Data, Reader};

use crate::error::{ParseError, ParseResult};
use crate::types::{DataSet, Value};

/// Ingest the first worksheet of a workbook (`.xlsx`, `.xls`, `.xlsb`, `.ods`) into an in-memory
/// `DataSet`.
///
/// Behavior:
/// - The workbook kind is detected from the file contents, so a workbook uploaded under a
///   misleading extension still opens
/// - The first non-empty row is the header row
/// - Remaining rows are converted cell by cell; integral floats become integers
pub fn ingest_excel_from_path(path: impl AsRef<Path>) -> ParseResult<DataSet> {
    let bytes = fs::read(path)?;
    ingest_excel_from_bytes(bytes)
}

/// Ingest the first worksheet of an in-memory workbook.
pub fn ingest_excel_from_bytes(bytes: Vec<u8>) -> ParseResult<DataSet> {
    let mut workbook = open_workbook_auto_from_rs(Cursor::new(bytes))?;

    let sheet = workbook
        .sheet_names()
        .first()
        .cloned()
        .ok_or_else(|| ParseError::Malformed {
            message: "workbook has no sheets".to_string(),
        })?;
    let range = workbook.worksheet_range(&sheet)?;
    ingest_sheet_range(&sheet, &range)
}

fn ingest_sheet_range(sheet: &str, range: &calamine::Range<Data>) -> ParseResult<DataSet> {
    let mut rows_iter = range
        .rows()
        .skip_while(|row| row.iter().all(|c| matches!(c, Data::Empty)));

    let header = rows_iter.next().ok_or_else(|| ParseError::Malformed {
        message: format!("sheet '{sheet}' has no non-empty rows (no header row found)"),
    })?;
    let names: Vec<String> = header.iter().map(cell_to_header_string).collect();

    let rows = rows_iter
        .map(|row| {
            (0..names.len())
                .map(|idx| convert_cell(row.get(idx).unwrap_or(&Data::Empty)))
                .collect()
        })
        .collect();

    Ok(DataSet::from_cells(names, rows))
}

fn cell_to_header_string(c: &Data) -> String {
    match c {
        Data::String(s) => s.trim().to_string(),
        Data::Float(f) => {
            if f.fract() == 0.0 {
                (*f as i64).to_string()
            } else {
                f.to_string()
            }
        }
        Data::Empty => String::new(),
        _ => c.to_string(),
    }
}

fn convert_cell(c: &Data) -> Value {
    match c {
        Data::Empty => Value::Null,
        Data::Int(i) => Value::Int64(*i),
        Data::Float(f) => {
            if f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
                Value::Int64(*f as i64)
            } else {
                Value::Float64(*f)
            }
        }
        Data::Bool(b) => Value::Bool(*b),
        Data::String(s) if s.is_empty() => Value::Null,
        Data::String(s) => Value::Utf8(s.clone()),
        Data::DateTimeIso(s) | Data::DurationIso(s) => Value::Utf8(s.clone()),
        Data::Error(_) => Value::Null,
        other => Value::Utf8(other.to_string()),
    }
}
