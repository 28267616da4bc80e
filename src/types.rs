//! Core data model types for ingestion.
//!
//! Uploaded files are loaded into an in-memory [`DataSet`]. Unlike a schema-first pipeline, the
//! [`Schema`] here is inferred while loading: every column gets the [`DataType`] that unifies the
//! cells it holds (see [`DataType::unify`]).

use std::fmt;

/// Logical data type for a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataType {
    /// 64-bit signed integer.
    Int64,
    /// 64-bit floating point number.
    Float64,
    /// Boolean.
    Bool,
    /// UTF-8 string.
    Utf8,
    /// Nested object or list.
    Json,
}

impl DataType {
    /// Widen two cell types into the narrowest type that can hold both.
    ///
    /// - identical types are kept
    /// - `Int64` and `Float64` widen to `Float64`
    /// - anything combined with `Json` becomes `Json`
    /// - every other mix falls back to `Utf8`
    pub fn unify(self, other: DataType) -> DataType {
        use DataType::*;
        match (self, other) {
            (a, b) if a == b => a,
            (Int64, Float64) | (Float64, Int64) => Float64,
            (Json, _) | (_, Json) => Json,
            _ => Utf8,
        }
    }
}

/// A single named, typed field in a [`Schema`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Field {
    /// Field/column name.
    pub name: String,
    /// Field data type.
    pub data_type: DataType,
}

impl Field {
    /// Create a new field.
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
        }
    }
}

/// Ordered list of fields describing the columns of a [`DataSet`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Schema {
    /// Ordered list of fields.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Create a new schema from fields.
    pub fn new(fields: Vec<Field>) -> Self {
        Self { fields }
    }

    /// Iterate field names in order.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        self.fields.iter().map(|f| f.name.as_str())
    }
}

/// A single value in a [`DataSet`].
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    /// Missing/empty value.
    Null,
    /// 64-bit signed integer.
    Int64(i64),
    /// 64-bit float.
    Float64(f64),
    /// Boolean.
    Bool(bool),
    /// UTF-8 string.
    Utf8(String),
    /// Nested object or list, kept as parsed JSON.
    Json(serde_json::Value),
}

impl Value {
    /// The type of this value, or `None` for [`Value::Null`].
    pub fn data_type(&self) -> Option<DataType> {
        match self {
            Value::Null => None,
            Value::Int64(_) => Some(DataType::Int64),
            Value::Float64(_) => Some(DataType::Float64),
            Value::Bool(_) => Some(DataType::Bool),
            Value::Utf8(_) => Some(DataType::Utf8),
            Value::Json(_) => Some(DataType::Json),
        }
    }

    /// Convert this value so it can live in a column of type `target`.
    ///
    /// Callers pass the unified column type, so the conversions here are always widening:
    /// integers to floats, scalars to text, scalars to JSON.
    pub fn coerce(self, target: DataType) -> Value {
        match (self, target) {
            (Value::Null, _) => Value::Null,
            (Value::Int64(i), DataType::Float64) => Value::Float64(i as f64),
            (Value::Json(j), DataType::Json) => Value::Json(j),
            (v, DataType::Json) => Value::Json(v.into_json()),
            (Value::Utf8(s), DataType::Utf8) => Value::Utf8(s),
            (v, DataType::Utf8) => Value::Utf8(v.to_string()),
            (v, _) => v,
        }
    }

    /// Render this value as JSON.
    pub fn into_json(self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Int64(i) => serde_json::Value::from(i),
            Value::Float64(f) => serde_json::Number::from_f64(f)
                .map(serde_json::Value::Number)
                .unwrap_or(serde_json::Value::Null),
            Value::Bool(b) => serde_json::Value::Bool(b),
            Value::Utf8(s) => serde_json::Value::String(s),
            Value::Json(j) => j,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int64(i) => write!(f, "{i}"),
            Value::Float64(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Utf8(s) => f.write_str(s),
            Value::Json(j) => write!(f, "{j}"),
        }
    }
}

/// In-memory tabular dataset.
///
/// Rows are stored as `Vec<Vec<Value>>` in the same order as the [`Schema`] fields. Every row has
/// exactly one value per field.
#[derive(Debug, Clone, PartialEq)]
pub struct DataSet {
    /// Schema describing row shape.
    pub schema: Schema,
    /// Row-major value storage.
    pub rows: Vec<Vec<Value>>,
}

impl DataSet {
    /// Create a dataset from schema and rows.
    pub fn new(schema: Schema, rows: Vec<Vec<Value>>) -> Self {
        Self { schema, rows }
    }

    /// Number of rows in the dataset.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Number of columns in the dataset.
    pub fn column_count(&self) -> usize {
        self.schema.fields.len()
    }

    /// Column names in order.
    pub fn column_names(&self) -> Vec<&str> {
        self.schema.field_names().collect()
    }

    /// The first row, if the dataset has any rows.
    pub fn first_row(&self) -> Option<&[Value]> {
        self.rows.first().map(Vec::as_slice)
    }

    /// Build a dataset from column names and untyped cells.
    ///
    /// Each column's type is unified over its non-null cells (all-null columns become `Utf8`),
    /// then every cell is coerced to that type. Rows shorter than `names` are padded with
    /// [`Value::Null`].
    pub fn from_cells(names: Vec<String>, mut rows: Vec<Vec<Value>>) -> Self {
        let width = names.len();
        let mut types: Vec<Option<DataType>> = vec![None; width];
        for row in &mut rows {
            row.resize(width, Value::Null);
            for (slot, value) in types.iter_mut().zip(row.iter()) {
                if let Some(t) = value.data_type() {
                    *slot = Some(match *slot {
                        Some(cur) => cur.unify(t),
                        None => t,
                    });
                }
            }
        }

        let types: Vec<DataType> = types
            .into_iter()
            .map(|t| t.unwrap_or(DataType::Utf8))
            .collect();

        let rows = rows
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .zip(types.iter())
                    .map(|(v, t)| v.coerce(*t))
                    .collect()
            })
            .collect();

        let fields = names
            .into_iter()
            .zip(types)
            .map(|(name, t)| Field::new(name, t))
            .collect();

        Self::new(Schema::new(fields), rows)
    }
}
