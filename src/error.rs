use thiserror::Error;

use crate::ingestion::sniff::DetectionError;

/// Convenience result type for loading a single candidate format.
pub type ParseResult<T> = Result<T, ParseError>;

/// Error returned when one candidate parser cannot load a file.
///
/// These are recovered by [`crate::import::Importer`], which moves on to the next candidate
/// format; they only reach callers inside [`crate::import::ImportOutcome::NoParserMatched`].
#[derive(Debug, Error)]
pub enum ParseError {
    /// Underlying I/O error (e.g. file not found, permission denied, invalid UTF-8).
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[cfg(feature = "excel")]
    /// Spreadsheet parsing error (feature-gated behind `excel`).
    #[error("excel error: {0}")]
    Excel(#[from] calamine::Error),

    /// Delimited-text parsing error.
    #[error("csv error: {0}")]
    Csv(#[from] csv::Error),

    /// JSON parsing error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The field delimiter could not be sniffed.
    #[error(transparent)]
    Detection(#[from] DetectionError),

    /// The input parsed but does not have a tabular shape this format accepts.
    #[error("malformed input: {message}")]
    Malformed { message: String },
}

/// Convenience result type for import operations.
pub type ImportResult<T> = Result<T, ImportError>;

/// Error returned by an import once a dataset is ready to be written (or the request itself is
/// unusable). Unlike [`ParseError`], these always surface to the caller.
#[derive(Debug, Error)]
pub enum ImportError {
    /// A table or schema name is not a safe SQL identifier.
    #[error("invalid {kind} name '{name}': {reason}")]
    InvalidIdentifier {
        kind: &'static str,
        name: String,
        reason: &'static str,
    },

    /// The destination database could not be reached or refused the credentials, or the
    /// connection descriptor is unusable.
    #[error("connection error: {message}")]
    Connection { message: String },

    /// Creating or populating the destination table failed.
    #[error("write error: {message}")]
    Write { message: String },
}

impl ImportError {
    pub(crate) fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    pub(crate) fn write(message: impl Into<String>) -> Self {
        Self::Write {
            message: message.into(),
        }
    }
}
