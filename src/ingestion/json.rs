//! JSON ingestion implementation.
//!
//! Supported inputs:
//! - A JSON array of objects: `[{"a":1}, {"a":2}]`
//! - A single object, loaded as one row
//! - An object of equal-length arrays, loaded column-wise: `{"a":[1,2], "b":[3,4]}` is two rows
//! - Newline-delimited JSON (NDJSON): `{"a":1}\n{"a":2}\n`
//!
//! Columns are the union of the records' top-level keys, in first-seen order. Nested objects and
//! arrays are kept whole as [`Value::Json`].

use std::fs;
use std::path::Path;

use crate::error::{ParseError, ParseResult};
use crate::types::{DataSet, Value};

/// Ingest JSON into an in-memory `DataSet`.
pub fn ingest_json_from_path(path: impl AsRef<Path>) -> ParseResult<DataSet> {
    let text = fs::read_to_string(path)?;
    ingest_json_from_str(&text)
}

/// Ingest JSON from an in-memory string into a [`DataSet`].
pub fn ingest_json_from_str(input: &str) -> ParseResult<DataSet> {
    let trimmed = input.trim().trim_start_matches('\u{feff}');
    if trimmed.is_empty() {
        return Err(ParseError::Malformed {
            message: "json input is empty".to_string(),
        });
    }

    // First try parsing as a single JSON value (array or object).
    match serde_json::from_str::<serde_json::Value>(trimmed) {
        Ok(serde_json::Value::Array(items)) => ingest_json_values(items),
        Ok(serde_json::Value::Object(map)) if is_column_oriented(&map) => Ok(ingest_json_columns(map)),
        Ok(v @ serde_json::Value::Object(_)) => ingest_json_values(vec![v]),
        Ok(_) => Err(ParseError::Malformed {
            message: "json must be an object, an array of objects, or NDJSON".to_string(),
        }),
        Err(whole_err) => {
            // Only content that starts like an object can be NDJSON.
            if !trimmed.starts_with('{') {
                return Err(whole_err.into());
            }
            let mut values = Vec::new();
            for line in trimmed.lines() {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                values.push(serde_json::from_str::<serde_json::Value>(line)?);
            }
            ingest_json_values(values)
        }
    }
}

fn ingest_json_values(values: Vec<serde_json::Value>) -> ParseResult<DataSet> {
    let mut records = Vec::with_capacity(values.len());
    for (idx0, v) in values.into_iter().enumerate() {
        match v {
            serde_json::Value::Object(map) => records.push(map),
            _ => {
                return Err(ParseError::Malformed {
                    message: format!("row {} is not a json object", idx0 + 1),
                });
            }
        }
    }

    let mut names: Vec<String> = Vec::new();
    for record in &records {
        for key in record.keys() {
            if !names.iter().any(|n| n == key) {
                names.push(key.clone());
            }
        }
    }

    let rows = records
        .into_iter()
        .map(|mut record| {
            names
                .iter()
                .map(|name| record.remove(name).map_or(Value::Null, convert_json_value))
                .collect()
        })
        .collect();

    Ok(DataSet::from_cells(names, rows))
}

/// An object whose values are all arrays of one length, e.g. `{"a": [1, 2], "b": [3, 4]}`.
fn is_column_oriented(map: &serde_json::Map<String, serde_json::Value>) -> bool {
    let mut lengths = map.values().map(|v| v.as_array().map(Vec::len));
    match lengths.next() {
        Some(Some(first)) => lengths.all(|len| len == Some(first)),
        _ => false,
    }
}

fn ingest_json_columns(map: serde_json::Map<String, serde_json::Value>) -> DataSet {
    let mut names = Vec::with_capacity(map.len());
    let mut columns = Vec::with_capacity(map.len());
    for (name, values) in map {
        names.push(name);
        if let serde_json::Value::Array(items) = values {
            columns.push(items.into_iter());
        }
    }

    let row_count = columns.first().map_or(0, |c| c.len());
    let rows = (0..row_count)
        .map(|_| {
            columns
                .iter_mut()
                .map(|col| col.next().map_or(Value::Null, convert_json_value))
                .collect()
        })
        .collect();

    DataSet::from_cells(names, rows)
}

fn convert_json_value(v: serde_json::Value) -> Value {
    match v {
        serde_json::Value::Null => Value::Null,
        serde_json::Value::Bool(b) => Value::Bool(b),
        serde_json::Value::Number(n) => {
            if let Some(i) = n.as_i64() {
                Value::Int64(i)
            } else {
                n.as_f64().map_or(Value::Null, Value::Float64)
            }
        }
        serde_json::Value::String(s) => Value::Utf8(s),
        other @ (serde_json::Value::Array(_) | serde_json::Value::Object(_)) => Value::Json(other),
    }
}
