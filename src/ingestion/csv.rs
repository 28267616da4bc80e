//! Delimited-text ingestion.

use std::fs;
use std::path::Path;

use tracing::warn;

use crate::error::{ParseError, ParseResult};
use crate::types::{DataSet, DataType, Field, Schema, Value};

use super::sniff::{self, DEFAULT_DELIMITER};

/// Cell contents treated as missing values.
const NA_VALUES: [&str; 7] = ["NA", "N/A", "NULL", "null", "NaN", "nan", "#N/A"];

/// Ingest a delimited text file into an in-memory [`DataSet`].
///
/// Rules:
///
/// - The delimiter is sniffed from the first line, falling back to `,` when sniffing fails.
/// - The first record is the header.
/// - Every record must have as many fields as the header.
/// - Column types are inferred from the cells (see [`infer_cell_type`]).
pub fn ingest_csv_from_path(path: impl AsRef<Path>) -> ParseResult<DataSet> {
    let path = path.as_ref();
    let delimiter = match sniff::detect_separator_from_path(path)? {
        Ok(d) => d,
        Err(e) => {
            warn!(path = %path.display(), error = %e, "falling back to default delimiter");
            DEFAULT_DELIMITER
        }
    };
    let text = fs::read_to_string(path)?;
    ingest_csv_from_str(&text, delimiter)
}

/// Ingest delimited text from an in-memory string using a known delimiter.
pub fn ingest_csv_from_str(input: &str, delimiter: u8) -> ParseResult<DataSet> {
    let input = input.strip_prefix('\u{feff}').unwrap_or(input);
    if input.trim().is_empty() {
        return Err(ParseError::Malformed {
            message: "delimited input is empty".to_string(),
        });
    }
    if is_json_document(input) {
        return Err(ParseError::Malformed {
            message: "input is JSON, not delimited text".to_string(),
        });
    }

    let mut rdr = csv::ReaderBuilder::new()
        .has_headers(true)
        .delimiter(delimiter)
        .from_reader(input.as_bytes());
    ingest_csv_from_reader(&mut rdr)
}

/// Ingest CSV data from an existing CSV reader.
///
/// Column names are taken verbatim from the header; normalization happens in
/// [`super::unified::load_dataset`].
pub fn ingest_csv_from_reader<R: std::io::Read>(rdr: &mut csv::Reader<R>) -> ParseResult<DataSet> {
    let headers: Vec<String> = rdr.headers()?.iter().map(str::to_owned).collect();

    let mut records: Vec<csv::StringRecord> = Vec::new();
    for result in rdr.records() {
        records.push(result?);
    }

    let mut types: Vec<Option<DataType>> = vec![None; headers.len()];
    for record in &records {
        for (slot, raw) in types.iter_mut().zip(record.iter()) {
            if let Some(t) = infer_cell_type(raw) {
                *slot = Some(slot.map_or(t, |cur| cur.unify(t)));
            }
        }
    }
    let types: Vec<DataType> = types
        .into_iter()
        .map(|t| t.unwrap_or(DataType::Utf8))
        .collect();

    let mut rows: Vec<Vec<Value>> = Vec::with_capacity(records.len());
    for (row_idx0, record) in records.iter().enumerate() {
        // Report 1-based row number for users; +1 again because header is row 1.
        let user_row = row_idx0 + 2;
        let mut row: Vec<Value> = Vec::with_capacity(headers.len());
        for (col_idx, data_type) in types.iter().enumerate() {
            let raw = record.get(col_idx).unwrap_or("");
            row.push(parse_typed_value(user_row, &headers[col_idx], *data_type, raw)?);
        }
        rows.push(row);
    }

    let fields = headers
        .into_iter()
        .zip(types)
        .map(|(name, t)| Field::new(name, t))
        .collect();
    Ok(DataSet::new(Schema::new(fields), rows))
}

/// Classify a single raw cell, or `None` for a missing value.
pub fn infer_cell_type(raw: &str) -> Option<DataType> {
    let trimmed = raw.trim();
    if is_missing(trimmed) {
        return None;
    }
    if trimmed.parse::<i64>().is_ok() {
        Some(DataType::Int64)
    } else if trimmed.parse::<f64>().is_ok() {
        Some(DataType::Float64)
    } else if parse_bool(trimmed).is_some() {
        Some(DataType::Bool)
    } else {
        Some(DataType::Utf8)
    }
}

/// True when `input` is a JSON array/object, or its first line is one (NDJSON).
///
/// A bracketed header such as `[id],name` is not JSON and stays delimited text.
fn is_json_document(input: &str) -> bool {
    let trimmed = input.trim();
    if !(trimmed.starts_with('{') || trimmed.starts_with('[')) {
        return false;
    }
    let parses = |s: &str| {
        matches!(
            serde_json::from_str::<serde_json::Value>(s),
            Ok(serde_json::Value::Object(_) | serde_json::Value::Array(_))
        )
    };
    parses(trimmed) || trimmed.lines().next().is_some_and(|line| parses(line.trim()))
}

fn is_missing(trimmed: &str) -> bool {
    trimmed.is_empty() || NA_VALUES.contains(&trimmed)
}

fn parse_typed_value(row: usize, column: &str, data_type: DataType, raw: &str) -> ParseResult<Value> {
    let trimmed = raw.trim();
    if is_missing(trimmed) {
        return Ok(Value::Null);
    }

    let malformed = |message: String| ParseError::Malformed {
        message: format!("row {row} column '{column}': {message} (raw='{raw}')"),
    };

    match data_type {
        DataType::Utf8 => Ok(Value::Utf8(raw.to_owned())),
        DataType::Int64 => trimmed
            .parse::<i64>()
            .map(Value::Int64)
            .map_err(|e| malformed(e.to_string())),
        DataType::Float64 => trimmed
            .parse::<f64>()
            .map(Value::Float64)
            .map_err(|e| malformed(e.to_string())),
        DataType::Bool => parse_bool(trimmed)
            .map(Value::Bool)
            .ok_or_else(|| malformed("expected bool (true/false)".to_string())),
        DataType::Json => Err(malformed("delimited text has no nested values".to_string())),
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    if s.eq_ignore_ascii_case("true") {
        Some(true)
    } else if s.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
