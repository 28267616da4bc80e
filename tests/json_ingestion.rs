use serde_json::json;

use tabular_uploader::ingestion::json::{ingest_json_from_path, ingest_json_from_str};
use tabular_uploader::types::{DataType, Value};
use tabular_uploader::ParseError;

#[test]
fn ingest_json_array_of_objects() {
    let ds = ingest_json_from_path("tests/fixtures/people.json").unwrap();

    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.column_names(), vec!["id", "Name", "meta", "tags"]);
    assert_eq!(ds.schema.fields[0].data_type, DataType::Int64);
    assert_eq!(ds.schema.fields[2].data_type, DataType::Json);
    assert_eq!(
        ds.rows[0][2],
        Value::Json(json!({"team": "engines", "level": 3}))
    );
    assert_eq!(ds.rows[1][3], Value::Json(json!([])));
}

#[test]
fn ingest_ndjson_unions_keys_in_first_seen_order() {
    let ds = ingest_json_from_path("tests/fixtures/events.ndjson").unwrap();

    assert_eq!(ds.column_names(), vec!["id", "event", "extra"]);
    assert_eq!(ds.rows[0][2], Value::Null);
    assert_eq!(ds.rows[1][2], Value::Bool(true));
}

#[test]
fn ingest_single_object_as_one_row() {
    let ds = ingest_json_from_str(r#"{"a": 1, "b": "x"}"#).unwrap();
    assert_eq!(ds.row_count(), 1);
    assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::Utf8("x".to_string())]);
}

#[test]
fn ingest_json_widens_int_and_float() {
    let ds = ingest_json_from_str(r#"[{"v": 1}, {"v": 2.5}]"#).unwrap();
    assert_eq!(ds.schema.fields[0].data_type, DataType::Float64);
    assert_eq!(ds.rows[0][0], Value::Float64(1.0));
}

#[test]
fn ingest_json_rejects_non_object_rows() {
    let err = ingest_json_from_str("[1, 2, 3]").unwrap_err();
    assert!(matches!(err, ParseError::Malformed { .. }));
}

#[test]
fn ingest_json_rejects_scalars_and_text() {
    assert!(matches!(ingest_json_from_str("42").unwrap_err(), ParseError::Malformed { .. }));
    assert!(matches!(ingest_json_from_str("id,name\n1,Ada\n").unwrap_err(), ParseError::Json(_)));
}

#[test]
fn ingest_json_empty_input_is_malformed() {
    assert!(matches!(ingest_json_from_str("  \n").unwrap_err(), ParseError::Malformed { .. }));
}

#[test]
fn ingest_object_of_arrays_column_wise() {
    let ds = ingest_json_from_str(r#"{"a": [1, 2], "b": ["x", null]}"#).unwrap();

    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.column_names(), vec!["a", "b"]);
    assert_eq!(ds.rows[0], vec![Value::Int64(1), Value::Utf8("x".to_string())]);
    assert_eq!(ds.rows[1], vec![Value::Int64(2), Value::Null]);
}

#[test]
fn ingest_object_of_uneven_arrays_as_one_row() {
    let ds = ingest_json_from_str(r#"{"a": [1, 2], "b": [3]}"#).unwrap();

    assert_eq!(ds.row_count(), 1);
    assert_eq!(ds.rows[0][0], Value::Json(json!([1, 2])));
}
