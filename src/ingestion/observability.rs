use std::path::PathBuf;

use tracing::{error, info, warn};

use crate::error::ParseError;

use super::unified::IngestionFormat;

/// Severity classification used for observer callbacks and alerting thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum IngestionSeverity {
    /// A candidate parser rejected the file; the next candidate may still succeed.
    Warning,
    /// Critical error (typically I/O or other infrastructure failures).
    Critical,
}

/// Context about one load attempt.
#[derive(Debug, Clone)]
pub struct IngestionContext {
    /// The input path being loaded.
    pub path: PathBuf,
    /// Candidate format used for this attempt.
    pub format: IngestionFormat,
}

/// Minimal stats reported on a successful load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IngestionStats {
    /// Number of loaded rows.
    pub rows: usize,
    /// Number of loaded columns.
    pub columns: usize,
}

/// Observer interface for load attempts.
///
/// Implementors can record metrics, logs, or trigger alerts.
pub trait IngestionObserver: Send + Sync {
    /// Called when a candidate loads successfully.
    fn on_success(&self, _ctx: &IngestionContext, _stats: IngestionStats) {}

    /// Called when a candidate fails.
    fn on_failure(&self, _ctx: &IngestionContext, _severity: IngestionSeverity, _error: &ParseError) {}

    /// Called when a failure meets an alert threshold.
    ///
    /// Default behavior forwards to [`Self::on_failure`].
    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &ParseError) {
        self.on_failure(ctx, severity, error)
    }
}

/// Logs load attempts as `tracing` events.
#[derive(Debug, Default)]
pub struct TracingObserver;

impl IngestionObserver for TracingObserver {
    fn on_success(&self, ctx: &IngestionContext, stats: IngestionStats) {
        info!(
            format = %ctx.format,
            path = %ctx.path.display(),
            rows = stats.rows,
            columns = stats.columns,
            "loaded candidate"
        );
    }

    fn on_failure(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &ParseError) {
        warn!(
            ?severity,
            format = %ctx.format,
            path = %ctx.path.display(),
            %error,
            "candidate rejected"
        );
    }

    fn on_alert(&self, ctx: &IngestionContext, severity: IngestionSeverity, error: &ParseError) {
        error!(
            ?severity,
            format = %ctx.format,
            path = %ctx.path.display(),
            %error,
            "ingest alert"
        );
    }
}
