//! File loading: delimiter sniffing, format resolution, and the per-format parsers.
//!
//! Most callers go through [`crate::import::Importer`], which tries every candidate from
//! [`resolve_candidates`] in order. The pieces are public for direct use:
//!
//! - [`sniff`]: field delimiter detection from one sample line
//! - [`csv`], [`json`], `excel` (feature `excel`): format-specific parsers
//! - [`load_dataset`]: run one candidate and normalize column names

pub mod csv;
#[cfg(feature = "excel")]
pub mod excel;
pub mod json;
pub mod observability;
pub mod sniff;
pub mod unified;

pub use observability::{IngestionContext, IngestionObserver, IngestionSeverity, IngestionStats, TracingObserver};
pub use sniff::{detect_separator, DetectionError};
pub use unified::{
    load_dataset, load_with_options, normalize_column_names, resolve_candidates, IngestionFormat, LoadOptions,
};
