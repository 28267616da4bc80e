//! Format resolution and the single-candidate loader.
//!
//! - [`resolve_candidates`] turns a file path into the ordered list of formats worth trying.
//! - [`load_dataset`] runs one candidate and normalizes the resulting column names.
//! - [`load_with_options`] adds observer reporting around [`load_dataset`].
//!
//! The fallback loop over candidates lives in [`crate::import::Importer`].

use std::collections::HashSet;
use std::fmt;
use std::path::Path;
use std::sync::Arc;

use crate::error::{ParseError, ParseResult};
use crate::types::DataSet;

use super::observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats};
use super::{csv, json};

/// Supported ingestion formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IngestionFormat {
    /// Delimited text (comma, semicolon, tab, or pipe separated).
    Csv,
    /// JSON array-of-objects, single object, or NDJSON.
    Json,
    /// Spreadsheet/workbook formats (feature-gated behind `excel`).
    Excel,
}

impl IngestionFormat {
    /// Fallback order used when the extension says nothing useful.
    pub const FALLBACK_ORDER: [IngestionFormat; 3] = [Self::Csv, Self::Json, Self::Excel];

    /// Parse an ingestion format from a file extension (case-insensitive).
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.to_ascii_lowercase().as_str() {
            "csv" | "tsv" => Some(Self::Csv),
            "json" | "ndjson" | "jsonl" => Some(Self::Json),
            "xlsx" | "xls" | "xlsm" | "xlsb" | "ods" => Some(Self::Excel),
            _ => None,
        }
    }

    /// Short lowercase name used in logs and responses.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
            Self::Excel => "excel",
        }
    }
}

impl fmt::Display for IngestionFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Ordered list of candidate formats for `path`.
///
/// A recognized extension yields exactly that format; any other (or missing) extension yields
/// every format in [`IngestionFormat::FALLBACK_ORDER`], since uploads do not reliably carry
/// correct extensions.
pub fn resolve_candidates(path: impl AsRef<Path>) -> Vec<IngestionFormat> {
    path.as_ref()
        .extension()
        .and_then(|s| s.to_str())
        .and_then(IngestionFormat::from_extension)
        .map(|f| vec![f])
        .unwrap_or_else(|| IngestionFormat::FALLBACK_ORDER.to_vec())
}

/// Options controlling how files are loaded.
///
/// Use [`Default`] for common cases.
#[derive(Clone)]
pub struct LoadOptions {
    /// If `None`, candidates come from [`resolve_candidates`]; otherwise only this format is
    /// tried.
    pub format: Option<IngestionFormat>,
    /// Optional observer for logging/alerts.
    pub observer: Option<Arc<dyn IngestionObserver>>,
    /// Severity threshold at which `on_alert` is invoked.
    pub alert_at_or_above: IngestionSeverity,
}

impl fmt::Debug for LoadOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoadOptions")
            .field("format", &self.format)
            .field("observer_set", &self.observer.is_some())
            .field("alert_at_or_above", &self.alert_at_or_above)
            .finish()
    }
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            format: None,
            observer: None,
            alert_at_or_above: IngestionSeverity::Critical,
        }
    }
}

impl LoadOptions {
    /// Candidate formats for `path`, honoring [`Self::format`].
    pub fn candidates_for(&self, path: &Path) -> Vec<IngestionFormat> {
        match self.format {
            Some(f) => vec![f],
            None => resolve_candidates(path),
        }
    }
}

/// Load `path` with a single candidate parser.
///
/// On success every column name is lowercased (see [`normalize_column_names`]). A parse that
/// yields no columns at all is reported as [`ParseError::Malformed`].
pub fn load_dataset(path: impl AsRef<Path>, format: IngestionFormat) -> ParseResult<DataSet> {
    let path = path.as_ref();
    let mut ds = match format {
        IngestionFormat::Csv => csv::ingest_csv_from_path(path)?,
        IngestionFormat::Json => json::ingest_json_from_path(path)?,
        IngestionFormat::Excel => ingest_excel_dispatch(path)?,
    };

    if ds.column_count() == 0 {
        return Err(ParseError::Malformed {
            message: format!("no columns found in {format} input"),
        });
    }

    let names = ds.schema.fields.iter().map(|f| f.name.clone()).collect();
    for (field, name) in ds.schema.fields.iter_mut().zip(normalize_column_names(names)) {
        field.name = name;
    }
    Ok(ds)
}

/// Load with one candidate and report the outcome to `options.observer`.
///
/// When an observer is configured, this function reports:
///
/// - `on_success` on success, with row/column stats
/// - `on_failure` on failure, with a computed severity
/// - `on_alert` on failure when the computed severity is >= `options.alert_at_or_above`
pub fn load_with_options(
    path: impl AsRef<Path>,
    format: IngestionFormat,
    options: &LoadOptions,
) -> ParseResult<DataSet> {
    let path = path.as_ref();
    let result = load_dataset(path, format);

    if let Some(obs) = options.observer.as_ref() {
        let ctx = IngestionContext {
            path: path.to_path_buf(),
            format,
        };
        match &result {
            Ok(ds) => obs.on_success(
                &ctx,
                IngestionStats {
                    rows: ds.row_count(),
                    columns: ds.column_count(),
                },
            ),
            Err(e) => {
                let sev = severity_for_error(e);
                obs.on_failure(&ctx, sev, e);
                if sev >= options.alert_at_or_above {
                    obs.on_alert(&ctx, sev, e);
                }
            }
        }
    }

    result
}

/// Lowercase column names, name blank headers `unnamed_<i>`, and suffix duplicates with `.1`,
/// `.2`, ... in order of appearance.
pub fn normalize_column_names(names: Vec<String>) -> Vec<String> {
    let mut seen: HashSet<String> = HashSet::new();
    let mut out: Vec<String> = Vec::with_capacity(names.len());
    for (idx, name) in names.into_iter().enumerate() {
        let trimmed = name.trim();
        let base = if trimmed.is_empty() {
            format!("unnamed_{idx}")
        } else {
            trimmed.to_lowercase()
        };

        let mut candidate = base.clone();
        let mut n = 0;
        while seen.contains(&candidate) {
            n += 1;
            candidate = format!("{base}.{n}");
        }
        seen.insert(candidate.clone());
        out.push(candidate);
    }
    out
}

fn severity_for_error(e: &ParseError) -> IngestionSeverity {
    match e {
        ParseError::Io(err) if err.kind() == std::io::ErrorKind::InvalidData => {
            IngestionSeverity::Warning
        }
        ParseError::Io(_) => IngestionSeverity::Critical,
        ParseError::Csv(err) => match err.kind() {
            ::csv::ErrorKind::Io(_) => IngestionSeverity::Critical,
            _ => IngestionSeverity::Warning,
        },
        #[cfg(feature = "excel")]
        ParseError::Excel(_) => IngestionSeverity::Warning,
        ParseError::Json(_) | ParseError::Detection(_) | ParseError::Malformed { .. } => {
            IngestionSeverity::Warning
        }
    }
}

fn ingest_excel_dispatch(path: &Path) -> ParseResult<DataSet> {
    #[cfg(feature = "excel")]
    {
        super::excel::ingest_excel_from_path(path)
    }

    #[cfg(not(feature = "excel"))]
    {
        let _ = path;
        Err(ParseError::Malformed {
            message: "excel ingestion not enabled (enable cargo feature 'excel')".to_string(),
        })
    }
}
