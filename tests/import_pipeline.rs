mod common;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use serde_json::json;

use common::{base_descriptor, FailureMode, MemoryWriter};
use tabular_uploader::import::{table_name_from_filename, ImportOutcome, ImportRequest, Importer};
use tabular_uploader::ingestion::IngestionFormat;
use tabular_uploader::materialize::SqlType;
use tabular_uploader::types::Value;
use tabular_uploader::ImportError;

fn tmp_file(stem: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    let dir = std::env::temp_dir().join(format!("tabular-uploader-import-{nanos}"));
    std::fs::create_dir_all(&dir).unwrap();
    dir.join(format!("{stem}.{ext}"))
}

fn importer(writer: &Arc<MemoryWriter>) -> Importer {
    Importer::new(writer.clone())
}

#[tokio::test]
async fn csv_upload_replaces_table_named_after_file() {
    let writer = Arc::new(MemoryWriter::default());
    let request = ImportRequest::new("tests/fixtures/people.csv", base_descriptor());

    let outcome = importer(&writer).import_file(&request).await.unwrap();
    match outcome {
        ImportOutcome::Written {
            table,
            schema,
            format,
            rows,
            columns,
        } => {
            assert_eq!(table, "people");
            assert_eq!(schema, None);
            assert_eq!(format, IngestionFormat::Csv);
            assert_eq!(rows, 2);
            assert_eq!(columns, vec!["id", "name"]);
        }
        other => panic!("expected Written, got {other:?}"),
    }

    let stored = writer.table("people").unwrap();
    assert_eq!(stored.columns[0].sql_type, SqlType::BigInt);
    assert_eq!(stored.columns[1].sql_type, SqlType::Text);
    assert_eq!(stored.dataset.rows[0][1], Value::Utf8("Alice".to_string()));
    assert_eq!(stored.dataset.rows[1][1], Value::Utf8("Bob".to_string()));
}

#[tokio::test]
async fn second_import_replaces_first() {
    let writer = Arc::new(MemoryWriter::default());
    let path = tmp_file("inventory", "csv");

    std::fs::write(&path, "sku,qty\nA,1\nB,2\nC,3\n").unwrap();
    importer(&writer)
        .import_file(&ImportRequest::new(&path, base_descriptor()))
        .await
        .unwrap();

    std::fs::write(&path, "SKU;Location\nZ;north\n").unwrap();
    importer(&writer)
        .import_file(&ImportRequest::new(&path, base_descriptor()))
        .await
        .unwrap();

    let stored = writer.table("inventory").unwrap();
    assert_eq!(stored.dataset.column_names(), vec!["sku", "location"]);
    assert_eq!(stored.dataset.row_count(), 1);
    assert_eq!(writer.call_count(), 2);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn json_in_txt_falls_through_to_json_parser() {
    let writer = Arc::new(MemoryWriter::default());
    let request = ImportRequest::new("tests/fixtures/records.txt", base_descriptor());

    let outcome = importer(&writer).import_file(&request).await.unwrap();
    let ImportOutcome::Written { table, format, .. } = outcome else {
        panic!("expected Written");
    };
    assert_eq!(table, "records");
    assert_eq!(format, IngestionFormat::Json);
}

#[tokio::test]
async fn object_columns_are_stored_as_jsonb() {
    let writer = Arc::new(MemoryWriter::default());
    let request = ImportRequest::new("tests/fixtures/people.json", base_descriptor());

    importer(&writer).import_file(&request).await.unwrap();

    let stored = writer.table("people").unwrap();
    let types: Vec<(&str, SqlType)> = stored
        .columns
        .iter()
        .map(|c| (c.name.as_str(), c.sql_type))
        .collect();
    assert_eq!(
        types,
        vec![
            ("id", SqlType::BigInt),
            ("name", SqlType::Text),
            ("meta", SqlType::Jsonb),
            ("tags", SqlType::Text),
        ]
    );
    assert_eq!(
        stored.dataset.rows[1][2],
        Value::Json(json!({"team": "compilers", "level": 5}))
    );
}

#[tokio::test]
async fn unparseable_file_reports_no_parser_matched() {
    let writer = Arc::new(MemoryWriter::default());
    let request = ImportRequest::new("tests/fixtures/ragged.dat", base_descriptor());

    let outcome = importer(&writer).import_file(&request).await.unwrap();
    let ImportOutcome::NoParserMatched { attempts } = outcome else {
        panic!("expected NoParserMatched");
    };
    let formats: Vec<IngestionFormat> = attempts.iter().map(|a| a.format).collect();
    assert_eq!(
        formats,
        vec![IngestionFormat::Csv, IngestionFormat::Json, IngestionFormat::Excel]
    );
    assert_eq!(writer.call_count(), 0);
}

#[tokio::test]
async fn csv_extension_gets_exactly_one_attempt() {
    let writer = Arc::new(MemoryWriter::default());
    let path = tmp_file("broken", "csv");
    std::fs::write(&path, "a,b\n1,2,3\n").unwrap();

    let outcome = importer(&writer)
        .import_file(&ImportRequest::new(&path, base_descriptor()))
        .await
        .unwrap();
    let ImportOutcome::NoParserMatched { attempts } = outcome else {
        panic!("expected NoParserMatched");
    };
    assert_eq!(attempts.len(), 1);
    assert_eq!(attempts[0].format, IngestionFormat::Csv);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn explicit_table_and_schema_are_used() {
    let writer = Arc::new(MemoryWriter::default());
    let request = ImportRequest::new("tests/fixtures/people.csv", base_descriptor())
        .with_table("staff")
        .with_schema("staging");

    let outcome = importer(&writer).import_file(&request).await.unwrap();
    assert!(outcome.is_written());
    assert!(writer.table("staging.staff").is_some());
    assert!(writer.table("people").is_none());
}

#[tokio::test]
async fn invalid_table_name_is_rejected_before_parsing() {
    let writer = Arc::new(MemoryWriter::default());
    let request = ImportRequest::new("tests/fixtures/people.csv", base_descriptor())
        .with_table("people; DROP TABLE users");

    let err = importer(&writer).import_file(&request).await.unwrap_err();
    assert!(matches!(err, ImportError::InvalidIdentifier { kind: "table", .. }));
    assert_eq!(writer.call_count(), 0);
}

#[tokio::test]
async fn awkward_filename_becomes_valid_table_name() {
    let writer = Arc::new(MemoryWriter::default());
    let path = tmp_file("2024 sales-report", "csv");
    std::fs::write(&path, "a\n1\n").unwrap();

    let outcome = importer(&writer)
        .import_file(&ImportRequest::new(&path, base_descriptor()))
        .await
        .unwrap();
    let ImportOutcome::Written { table, .. } = outcome else {
        panic!("expected Written");
    };
    assert_eq!(table, "_2024_sales_report");
    assert!(writer.table("_2024_sales_report").is_some());

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn explicit_table_name_is_not_cleaned_up() {
    let writer = Arc::new(MemoryWriter::default());
    let request = ImportRequest::new("tests/fixtures/people.csv", base_descriptor()).with_table("my-table");

    let err = importer(&writer).import_file(&request).await.unwrap_err();
    assert!(matches!(err, ImportError::InvalidIdentifier { kind: "table", .. }));
}

#[tokio::test]
async fn bracketed_csv_header_imports() {
    let writer = Arc::new(MemoryWriter::default());
    let path = tmp_file("codes", "csv");
    std::fs::write(&path, "[id],name\n1,x\n").unwrap();

    let outcome = importer(&writer)
        .import_file(&ImportRequest::new(&path, base_descriptor()))
        .await
        .unwrap();
    let ImportOutcome::Written { columns, .. } = outcome else {
        panic!("expected Written");
    };
    assert_eq!(columns, vec!["[id]", "name"]);

    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn connection_errors_propagate() {
    let writer = Arc::new(MemoryWriter::failing(FailureMode::Connection));
    let request = ImportRequest::new("tests/fixtures/people.csv", base_descriptor());

    let err = importer(&writer).import_file(&request).await.unwrap_err();
    assert!(matches!(err, ImportError::Connection { .. }), "{err:?}");
}

#[tokio::test]
async fn write_errors_propagate() {
    let writer = Arc::new(MemoryWriter::failing(FailureMode::Write));
    let request = ImportRequest::new("tests/fixtures/people.csv", base_descriptor());

    let err = importer(&writer).import_file(&request).await.unwrap_err();
    assert!(matches!(err, ImportError::Write { .. }), "{err:?}");
}

#[tokio::test]
async fn overridden_descriptor_reaches_writer() {
    use tabular_uploader::connection::DescriptorOverrides;

    let writer = Arc::new(MemoryWriter::default());
    let descriptor = base_descriptor().with_overrides(&DescriptorOverrides {
        database: Some("analytics".to_string()),
        username: Some("loader".to_string()),
        password: None,
    });
    let request = ImportRequest::new("tests/fixtures/people.csv", descriptor);

    importer(&writer).import_file(&request).await.unwrap();

    let stored = writer.table("people").unwrap();
    assert_eq!(stored.database, "analytics");
    assert_eq!(stored.username, "loader");
}

#[test]
fn table_name_is_lowercased_stem_before_first_dot() {
    assert_eq!(table_name_from_filename("People.csv"), "people");
    assert_eq!(table_name_from_filename("/tmp/Sales.2024.xlsx"), "sales");
    assert_eq!(table_name_from_filename("README"), "readme");
    assert_eq!(table_name_from_filename("my-data.csv"), "my_data");
    assert_eq!(table_name_from_filename("2024 report.xlsx"), "_2024_report");
    assert_eq!(table_name_from_filename("Résumé.json"), "r_sum_");
    assert_eq!(table_name_from_filename(".hidden"), "");
    assert_eq!(table_name_from_filename(format!("{}.csv", "x".repeat(80))).len(), 63);
}
