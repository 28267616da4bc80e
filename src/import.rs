//! The "import file" operation.
//!
//! [`Importer::import_file`] walks one upload through the pipeline:
//!
//! 1. resolve candidate formats from the path ([`crate::ingestion::resolve_candidates`])
//! 2. try each candidate in order until one loads ([`crate::ingestion::load_with_options`])
//! 3. infer JSON column hints from the first row ([`crate::schema::infer_column_hints`])
//! 4. replace the destination table ([`crate::materialize::TableWriter`])
//!
//! Parsing and inference run synchronously on the calling task; only the write awaits.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use tracing::{info, warn};

use crate::connection::ConnectionDescriptor;
use crate::error::{ImportResult, ParseError};
use crate::ingestion::{load_with_options, IngestionFormat, LoadOptions, TracingObserver};
use crate::materialize::{TableTarget, TableWriter, MAX_IDENTIFIER_LEN};
use crate::schema::infer_column_hints;
use crate::types::DataSet;

/// One file to import.
#[derive(Debug, Clone)]
pub struct ImportRequest {
    /// Local path of the uploaded file.
    pub path: PathBuf,
    /// Destination table, validated as given. `None` or empty derives it from the file name.
    pub table: Option<String>,
    /// Destination schema. `None` or empty means the connection's default schema.
    pub schema: Option<String>,
    /// Where to write.
    pub descriptor: ConnectionDescriptor,
}

impl ImportRequest {
    pub fn new(path: impl Into<PathBuf>, descriptor: ConnectionDescriptor) -> Self {
        Self {
            path: path.into(),
            table: None,
            schema: None,
            descriptor,
        }
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Table name: the explicit one if given, otherwise derived from the path.
    pub fn table_name(&self) -> String {
        match &self.table {
            Some(t) if !t.is_empty() => t.clone(),
            _ => table_name_from_filename(&self.path),
        }
    }
}

/// Derive a table name from a file name: the part before the first `.`, lowercased.
///
/// Characters that cannot appear in a plain identifier become `_`, a leading digit gets a `_`
/// prefix, and the result is cut to [`MAX_IDENTIFIER_LEN`]. `People.2024.csv` becomes `people`;
/// `2024 report.xlsx` becomes `_2024_report`. An empty stem stays empty and fails validation.
pub fn table_name_from_filename(path: impl AsRef<Path>) -> String {
    let name = path
        .as_ref()
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or_default();
    let stem = name.split('.').next().unwrap_or_default().to_lowercase();

    let mut table: String = stem
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if table.starts_with(|c: char| c.is_ascii_digit()) {
        table.insert(0, '_');
    }
    table.truncate(MAX_IDENTIFIER_LEN);
    table
}

/// A rejected candidate format and why.
#[derive(Debug)]
pub struct FailedAttempt {
    pub format: IngestionFormat,
    pub error: ParseError,
}

/// How an import ended when nothing went wrong on the database side.
#[derive(Debug)]
pub enum ImportOutcome {
    /// A candidate loaded and the table was replaced.
    Written {
        table: String,
        schema: Option<String>,
        format: IngestionFormat,
        rows: usize,
        columns: Vec<String>,
    },
    /// Every candidate format failed; nothing was written.
    NoParserMatched { attempts: Vec<FailedAttempt> },
}

impl ImportOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, ImportOutcome::Written { .. })
    }
}

/// Runs imports against an injected [`TableWriter`].
///
/// Holds no per-import state; one importer serves every request.
#[derive(Clone)]
pub struct Importer {
    writer: Arc<dyn TableWriter>,
    options: LoadOptions,
}

impl Importer {
    /// Importer that reports load attempts through [`TracingObserver`].
    pub fn new(writer: Arc<dyn TableWriter>) -> Self {
        Self::with_options(
            writer,
            LoadOptions {
                observer: Some(Arc::new(TracingObserver)),
                ..Default::default()
            },
        )
    }

    pub fn with_options(writer: Arc<dyn TableWriter>, options: LoadOptions) -> Self {
        Self { writer, options }
    }

    /// Import one file.
    ///
    /// Returns `Ok(Written)` after a successful replace, `Ok(NoParserMatched)` when no candidate
    /// could load the file, and `Err` for invalid table/schema names or database failures.
    pub async fn import_file(&self, request: &ImportRequest) -> ImportResult<ImportOutcome> {
        let target = TableTarget::new(request.table_name(), request.schema.as_deref())?;

        let (format, dataset) = match self.load_first_candidate(&request.path) {
            Ok(found) => found,
            Err(attempts) => {
                warn!(
                    path = %request.path.display(),
                    attempts = attempts.len(),
                    "no parser matched upload"
                );
                return Ok(ImportOutcome::NoParserMatched { attempts });
            }
        };

        let hints = infer_column_hints(&dataset);
        let summary = self
            .writer
            .replace_table(&request.descriptor, &target, &dataset, &hints)
            .await?;

        info!(
            table = %target.qualified_name(),
            %format,
            rows = summary.rows_written,
            json_columns = hints.len(),
            "import finished"
        );

        Ok(ImportOutcome::Written {
            table: target.table().to_string(),
            schema: target.schema().map(str::to_string),
            format,
            rows: summary.rows_written,
            columns: summary.columns.into_iter().map(|c| c.name).collect(),
        })
    }

    /// Try each candidate format in order; stop at the first that loads.
    fn load_first_candidate(&self, path: &Path) -> Result<(IngestionFormat, DataSet), Vec<FailedAttempt>> {
        let mut attempts = Vec::new();
        for format in self.options.candidates_for(path) {
            match load_with_options(path, format, &self.options) {
                Ok(ds) => return Ok((format, ds)),
                Err(error) => attempts.push(FailedAttempt { format, error }),
            }
        }
        Err(attempts)
    }
}
