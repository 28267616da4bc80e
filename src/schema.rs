//! Storage-type hints inferred from a loaded [`DataSet`].
//!
//! Only the first row is sampled. A column whose first value is a key-value object is stored as
//! JSON; every other column is left to the writer's default mapping from [`crate::types::DataType`].

use std::collections::BTreeMap;

use crate::types::{DataSet, Value};

/// Structural kind of a sampled value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// Missing value.
    Null,
    /// Number, boolean, string, or a list.
    Scalar,
    /// Nested key-value object.
    Structured,
}

/// Classify a single value.
///
/// Lists count as [`ValueKind::Scalar`]: only objects ask for JSON storage.
pub fn classify(value: &Value) -> ValueKind {
    match value {
        Value::Null => ValueKind::Null,
        Value::Json(serde_json::Value::Object(_)) => ValueKind::Structured,
        Value::Json(serde_json::Value::Null) => ValueKind::Null,
        _ => ValueKind::Scalar,
    }
}

/// Storage type requested for a hinted column.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageType {
    /// A JSON-capable column type (`JSONB` on PostgreSQL).
    Json,
}

/// Column name → storage type, for columns that need something other than default inference.
pub type ColumnTypeHints = BTreeMap<String, StorageType>;

/// Build storage hints from the first row of `dataset`.
///
/// An empty dataset yields an empty mapping.
pub fn infer_column_hints(dataset: &DataSet) -> ColumnTypeHints {
    let Some(first) = dataset.first_row() else {
        return ColumnTypeHints::new();
    };

    dataset
        .schema
        .fields
        .iter()
        .zip(first)
        .filter(|(_, value)| classify(value) == ValueKind::Structured)
        .map(|(field, _)| (field.name.clone(), StorageType::Json))
        .collect()
}
