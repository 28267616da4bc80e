#![cfg(feature = "excel_test_writer")]

use std::path::PathBuf;
use std::time::{SystemTime, UNIX_EPOCH};

use tabular_uploader::ingestion::excel::ingest_excel_from_path;
use tabular_uploader::ingestion::{load_dataset, resolve_candidates, IngestionFormat};
use tabular_uploader::types::{DataType, Value};

fn tmp_file(name: &str, ext: &str) -> PathBuf {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap()
        .as_nanos();
    std::env::temp_dir().join(format!("tabular-uploader-{name}-{nanos}.{ext}"))
}

fn write_people_xlsx(path: &PathBuf, leading_blank_row: bool) {
    use rust_xlsxwriter::Workbook;

    let mut wb = Workbook::new();
    let ws = wb.add_worksheet();
    ws.set_name("People").unwrap();

    let top = if leading_blank_row { 1 } else { 0 };

    // header
    ws.write_string(top, 0, "ID").unwrap();
    ws.write_string(top, 1, "Name").unwrap();
    ws.write_string(top, 2, "Score").unwrap();
    ws.write_string(top, 3, "Active").unwrap();

    ws.write_number(top + 1, 0, 1).unwrap();
    ws.write_string(top + 1, 1, "Ada").unwrap();
    ws.write_number(top + 1, 2, 98.5).unwrap();
    ws.write_boolean(top + 1, 3, true).unwrap();

    ws.write_number(top + 2, 0, 2).unwrap();
    ws.write_string(top + 2, 1, "Grace").unwrap();
    ws.write_number(top + 2, 2, 87.25).unwrap();
    ws.write_boolean(top + 2, 3, false).unwrap();

    wb.save(path).unwrap();
}

#[test]
fn ingest_excel_first_sheet() {
    let path = tmp_file("people", "xlsx");
    write_people_xlsx(&path, false);

    let ds = ingest_excel_from_path(&path).unwrap();
    assert_eq!(ds.column_names(), vec!["ID", "Name", "Score", "Active"]);
    assert_eq!(ds.schema.fields[0].data_type, DataType::Int64);
    assert_eq!(ds.schema.fields[2].data_type, DataType::Float64);
    assert_eq!(
        ds.rows[0],
        vec![
            Value::Int64(1),
            Value::Utf8("Ada".to_string()),
            Value::Float64(98.5),
            Value::Bool(true),
        ]
    );

    let _ = std::fs::remove_file(&path);
}

#[test]
fn ingest_excel_skips_leading_blank_rows() {
    let path = tmp_file("blank-lead", "xlsx");
    write_people_xlsx(&path, true);

    let ds = ingest_excel_from_path(&path).unwrap();
    assert_eq!(ds.row_count(), 2);
    assert_eq!(ds.rows[1][1], Value::Utf8("Grace".to_string()));

    let _ = std::fs::remove_file(&path);
}

#[test]
fn workbook_under_unknown_extension_loads_through_fallback() {
    let path = tmp_file("disguised", "bin");
    write_people_xlsx(&path, false);

    let candidates = resolve_candidates(&path);
    assert_eq!(
        candidates,
        vec![IngestionFormat::Csv, IngestionFormat::Json, IngestionFormat::Excel]
    );

    let ds = load_dataset(&path, IngestionFormat::Excel).unwrap();
    assert_eq!(ds.column_names(), vec!["id", "name", "score", "active"]);

    let _ = std::fs::remove_file(&path);
}
