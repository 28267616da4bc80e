//! Writing a [`DataSet`] into a destination table with "replace" semantics.
//!
//! The [`TableWriter`] trait is the seam between the import pipeline and the database:
//! [`postgres::PostgresWriter`] is the production implementation, tests substitute their own.
//!
//! Replace means: drop any existing table of the same name (and schema), create it again with
//! the dataset's columns, then insert every row. Row indices are never written.

pub mod postgres;

use async_trait::async_trait;

use crate::connection::ConnectionDescriptor;
use crate::error::{ImportError, ImportResult};
use crate::schema::{ColumnTypeHints, StorageType};
use crate::types::{DataSet, DataType};

/// PostgreSQL's identifier length limit (NAMEDATALEN - 1).
pub const MAX_IDENTIFIER_LEN: usize = 63;

/// Destination of a write: a table, optionally inside a schema.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableTarget {
    table: String,
    schema: Option<String>,
}

impl TableTarget {
    /// Validate and build a target. An empty `schema` means "no schema".
    pub fn new(table: impl Into<String>, schema: Option<&str>) -> ImportResult<Self> {
        let table = table.into();
        validate_identifier("table", &table)?;
        let schema = match schema {
            Some(s) if !s.is_empty() => {
                validate_identifier("schema", s)?;
                Some(s.to_string())
            }
            _ => None,
        };
        Ok(Self { table, schema })
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn schema(&self) -> Option<&str> {
        self.schema.as_deref()
    }

    /// Quoted, schema-qualified name for use in SQL.
    pub fn qualified_name(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", quote_ident(s), quote_ident(&self.table)),
            None => quote_ident(&self.table),
        }
    }
}

/// Reject table/schema names that are not plain identifiers.
///
/// Accepted: ASCII letter or `_`, followed by ASCII letters, digits, or `_`, at most
/// [`MAX_IDENTIFIER_LEN`] bytes.
pub fn validate_identifier(kind: &'static str, name: &str) -> ImportResult<()> {
    let invalid = |reason| ImportError::InvalidIdentifier {
        kind,
        name: name.to_string(),
        reason,
    };

    let mut chars = name.chars();
    match chars.next() {
        None => return Err(invalid("must not be empty")),
        Some(c) if !(c.is_ascii_alphabetic() || c == '_') => {
            return Err(invalid("must start with a letter or underscore"));
        }
        Some(_) => {}
    }
    if !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(invalid("may only contain letters, digits, and underscores"));
    }
    if name.len() > MAX_IDENTIFIER_LEN {
        return Err(invalid("is longer than 63 bytes"));
    }
    Ok(())
}

/// Double-quote an identifier, doubling any embedded quotes.
pub fn quote_ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// SQL column types the writer emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlType {
    BigInt,
    DoublePrecision,
    Boolean,
    Text,
    Jsonb,
}

impl SqlType {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SqlType::BigInt => "BIGINT",
            SqlType::DoublePrecision => "DOUBLE PRECISION",
            SqlType::Boolean => "BOOLEAN",
            SqlType::Text => "TEXT",
            SqlType::Jsonb => "JSONB",
        }
    }

    /// Default mapping for an unhinted column. Nested values without a hint are stored as
    /// their JSON text.
    pub fn from_data_type(data_type: DataType) -> Self {
        match data_type {
            DataType::Int64 => SqlType::BigInt,
            DataType::Float64 => SqlType::DoublePrecision,
            DataType::Bool => SqlType::Boolean,
            DataType::Utf8 | DataType::Json => SqlType::Text,
        }
    }
}

/// One column of the table to create.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnPlan {
    pub name: String,
    pub sql_type: SqlType,
}

/// Decide the SQL type of every dataset column, applying `hints` first.
pub fn plan_columns(dataset: &DataSet, hints: &ColumnTypeHints) -> Vec<ColumnPlan> {
    dataset
        .schema
        .fields
        .iter()
        .map(|field| {
            let sql_type = match hints.get(&field.name) {
                Some(StorageType::Json) => SqlType::Jsonb,
                None => SqlType::from_data_type(field.data_type),
            };
            ColumnPlan {
                name: field.name.clone(),
                sql_type,
            }
        })
        .collect()
}

pub fn drop_table_sql(target: &TableTarget) -> String {
    format!("DROP TABLE IF EXISTS {}", target.qualified_name())
}

pub fn create_table_sql(target: &TableTarget, columns: &[ColumnPlan]) -> String {
    let cols = columns
        .iter()
        .map(|c| format!("{} {}", quote_ident(&c.name), c.sql_type.as_sql()))
        .collect::<Vec<_>>()
        .join(", ");
    format!("CREATE TABLE {} ({cols})", target.qualified_name())
}

/// Multi-row `INSERT` with numbered placeholders for `row_count` rows.
pub fn insert_sql(target: &TableTarget, columns: &[ColumnPlan], row_count: usize) -> String {
    let names = columns
        .iter()
        .map(|c| quote_ident(&c.name))
        .collect::<Vec<_>>()
        .join(", ");
    let width = columns.len();
    let tuples = (0..row_count)
        .map(|r| {
            let params = (1..=width)
                .map(|c| format!("${}", r * width + c))
                .collect::<Vec<_>>()
                .join(", ");
            format!("({params})")
        })
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO {} ({names}) VALUES {tuples}", target.qualified_name())
}

/// What a successful write produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriteSummary {
    pub rows_written: usize,
    pub columns: Vec<ColumnPlan>,
}

/// Destination for imported datasets.
#[async_trait]
pub trait TableWriter: Send + Sync {
    /// Replace `target` with the contents of `dataset`.
    ///
    /// Fails with [`ImportError::Connection`] when `descriptor` cannot be used to connect and
    /// with [`ImportError::Write`] when any statement fails.
    async fn replace_table(
        &self,
        descriptor: &ConnectionDescriptor,
        target: &TableTarget,
        dataset: &DataSet,
        hints: &ColumnTypeHints,
    ) -> ImportResult<WriteSummary>;
}
