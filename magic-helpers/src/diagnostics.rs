//! Where the loader and the evaluator report to.
//!
//! Nothing in this crate logs through global state on its own: callers hand a
//! [`DiagnosticsSink`] to the stages that produce diagnostics.

use crate::dataset::ParseError;
use crate::evaluation::ConfusionMatrix;
use tracing::{info, warn};

/// Receiver of structured diagnostics produced while running the pipeline.
pub trait DiagnosticsSink {
    /// A data row was dropped because it could not be parsed.
    fn row_skipped(&mut self, error: &ParseError);

    /// A confusion matrix was produced.
    fn evaluated(&mut self, _matrix: &ConfusionMatrix) {}
}

impl<S: DiagnosticsSink + ?Sized> DiagnosticsSink for &mut S {
    fn row_skipped(&mut self, error: &ParseError) {
        (**self).row_skipped(error)
    }

    fn evaluated(&mut self, matrix: &ConfusionMatrix) {
        (**self).evaluated(matrix)
    }
}

impl DiagnosticsSink for Vec<ParseError> {
    fn row_skipped(&mut self, error: &ParseError) {
        self.push(error.clone());
    }
}

/// Forwards diagnostics as `tracing` events.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticsSink for TracingSink {
    fn row_skipped(&mut self, error: &ParseError) {
        warn!(
            row = error.row,
            raw = %error.raw,
            reason = %error.kind,
            "skipping malformed row"
        );
    }

    fn evaluated(&mut self, matrix: &ConfusionMatrix) {
        info!(
            total = matrix.total(),
            accuracy = matrix.accuracy().unwrap_or(0.0),
            "evaluation finished"
        );
        for report in matrix.class_reports() {
            info!(class = %report.symbol, "{report}");
        }
    }
}

/// Keeps every diagnostic in memory.
#[derive(Debug, Clone, Default)]
pub struct CollectingSink {
    pub skipped: Vec<ParseError>,
    pub matrices: Vec<ConfusionMatrix>,
}

impl DiagnosticsSink for CollectingSink {
    fn row_skipped(&mut self, error: &ParseError) {
        self.skipped.push(error.clone());
    }

    fn evaluated(&mut self, matrix: &ConfusionMatrix) {
        self.matrices.push(matrix.clone());
    }
}
