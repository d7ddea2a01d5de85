//! Confusion matrices and the metrics derived from them.

use crate::dataset::Dataset;
use crate::diagnostics::DiagnosticsSink;
use crate::label::{Label, LabelAlphabet};
use crate::Float;
use ndarray::{Array2, ArrayView2, Axis};
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvaluationError {
    #[error("expected {expected} predictions (one per test record), found {found}")]
    LengthMismatch { expected: usize, found: usize },
    #[error("prediction at position {position} uses label {label}, which is not in the alphabet")]
    UnknownLabel { position: usize, label: Label },
}

/// Counts of (true label, predicted label) pairs over a full label alphabet.
///
/// Rows are true labels, columns predicted labels, both in alphabet order.
/// Labels that never occur still get their (zero) row and column. Metrics are
/// always recomputed from the counts.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct ConfusionMatrix {
    alphabet: LabelAlphabet,
    counts: Array2<usize>,
}

impl ConfusionMatrix {
    /// An all-zero matrix over `alphabet`.
    pub fn new(alphabet: LabelAlphabet) -> Self {
        let n = alphabet.len();
        ConfusionMatrix {
            alphabet,
            counts: Array2::zeros((n, n)),
        }
    }

    fn add(&mut self, truth: Label, predicted: Label) {
        self.counts[[truth.index(), predicted.index()]] += 1;
    }

    pub fn alphabet(&self) -> &LabelAlphabet {
        &self.alphabet
    }

    pub fn counts(&self) -> ArrayView2<'_, usize> {
        self.counts.view()
    }

    pub fn count(&self, truth: Label, predicted: Label) -> usize {
        self.counts
            .get([truth.index(), predicted.index()])
            .copied()
            .unwrap_or(0)
    }

    pub fn total(&self) -> usize {
        self.counts.sum()
    }

    pub fn correct(&self) -> usize {
        self.counts.diag().sum()
    }

    /// Number of records whose true label is `label`.
    pub fn row_sum(&self, label: Label) -> usize {
        self.sum_along(Axis(0), label)
    }

    /// Number of records predicted as `label`.
    pub fn column_sum(&self, label: Label) -> usize {
        self.sum_along(Axis(1), label)
    }

    fn sum_along(&self, axis: Axis, label: Label) -> usize {
        if !self.alphabet.contains(label) {
            return 0;
        }
        self.counts.index_axis(axis, label.index()).sum()
    }

    /// Fraction of records on the diagonal, `None` for an empty matrix.
    pub fn accuracy(&self) -> Option<f64> {
        ratio(self.correct(), self.total())
    }

    /// `matrix[c][c] / column_sum(c)`; `None` (undefined) when nothing was
    /// predicted as `c`.
    pub fn precision(&self, label: Label) -> Option<f64> {
        ratio(self.count(label, label), self.column_sum(label))
    }

    /// `matrix[c][c] / row_sum(c)`; `None` (undefined) when no record has
    /// true label `c`.
    pub fn recall(&self, label: Label) -> Option<f64> {
        ratio(self.count(label, label), self.row_sum(label))
    }

    /// Harmonic mean of precision and recall, undefined if either is.
    pub fn f1(&self, label: Label) -> Option<f64> {
        let p = self.precision(label)?;
        let r = self.recall(label)?;
        if p + r == 0.0 {
            Some(0.0)
        } else {
            Some(2.0 * p * r / (p + r))
        }
    }

    pub fn class_reports(&self) -> Vec<ClassReport> {
        self.alphabet
            .labels()
            .map(|label| ClassReport {
                label,
                symbol: self.alphabet.symbol(label).unwrap_or("?").to_string(),
                support: self.row_sum(label),
                precision: self.precision(label),
                recall: self.recall(label),
                f1: self.f1(label),
            })
            .collect()
    }
}

fn ratio(numerator: usize, denominator: usize) -> Option<f64> {
    (denominator > 0).then(|| numerator as f64 / denominator as f64)
}

impl Display for ConfusionMatrix {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let width = self
            .alphabet
            .symbols()
            .iter()
            .map(String::len)
            .chain(self.counts.iter().map(|c| c.to_string().len()))
            .chain(std::iter::once("true\\pred".len()))
            .max()
            .unwrap_or(0);

        write!(f, "{:<width$}", "true\\pred")?;
        for symbol in self.alphabet.symbols() {
            write!(f, " {symbol:>width$}")?;
        }
        writeln!(f)?;
        for (symbol, row) in self.alphabet.symbols().iter().zip(self.counts.rows()) {
            write!(f, "{symbol:<width$}")?;
            for count in row {
                write!(f, " {count:>width$}")?;
            }
            writeln!(f)?;
        }
        match self.accuracy() {
            Some(acc) => write!(f, "accuracy: {acc:.4} ({}/{})", self.correct(), self.total()),
            None => write!(f, "accuracy: undefined"),
        }
    }
}

/// Per-class metrics, as printed in an evaluation summary.
#[derive(Debug, Clone, PartialEq)]
pub struct ClassReport {
    pub label: Label,
    pub symbol: String,
    pub support: usize,
    pub precision: Option<f64>,
    pub recall: Option<f64>,
    pub f1: Option<f64>,
}

struct Score(Option<f64>);

impl Display for Score {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(v) => write!(f, "{v:.4}"),
            None => write!(f, "undefined"),
        }
    }
}

impl Display for ClassReport {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: precision={} recall={} f1={} support={}",
            self.symbol,
            Score(self.precision),
            Score(self.recall),
            Score(self.f1),
            self.support
        )
    }
}

/// Builds the confusion matrix of `predictions` against the true labels of
/// `test`, then hands it to `sink`.
///
/// `predictions[i]` must be the prediction for `test.records()[i]`.
///
/// # Errors
///
/// Returns `EvaluationError::LengthMismatch` if the lengths differ and
/// `EvaluationError::UnknownLabel` for a label outside the test alphabet.
pub fn evaluate<F, K>(
    test: &Dataset<F>,
    predictions: &[Label],
    mut sink: K,
) -> Result<ConfusionMatrix, EvaluationError>
where
    F: Float,
    K: DiagnosticsSink,
{
    if predictions.len() != test.len() {
        return Err(EvaluationError::LengthMismatch {
            expected: test.len(),
            found: predictions.len(),
        });
    }

    let mut matrix = ConfusionMatrix::new(test.alphabet().clone());
    for (position, (truth, &predicted)) in test.labels().zip(predictions).enumerate() {
        if !matrix.alphabet.contains(predicted) {
            return Err(EvaluationError::UnknownLabel {
                position,
                label: predicted,
            });
        }
        matrix.add(truth, predicted);
    }

    sink.evaluated(&matrix);
    Ok(matrix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CollectingSink;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    fn three_records() -> Dataset<f64> {
        Dataset::from_labelled([
            (1, array![0.0], "A"),
            (2, array![1.0], "B"),
            (3, array![2.0], "A"),
        ])
        .unwrap()
    }

    #[test]
    fn test_known_confusion_matrix() {
        let test = three_records();
        let a = test.alphabet().label_of("A").unwrap();
        let b = test.alphabet().label_of("B").unwrap();

        let mut sink = CollectingSink::default();
        let matrix = evaluate(&test, &[a, a, a], &mut sink).unwrap();

        assert_eq!(matrix.count(a, a), 2);
        assert_eq!(matrix.count(a, b), 0);
        assert_eq!(matrix.count(b, a), 1);
        assert_eq!(matrix.count(b, b), 0);
        assert_eq!(matrix.total(), 3);
        assert_abs_diff_eq!(matrix.accuracy().unwrap(), 2.0 / 3.0);
        assert_eq!(matrix.recall(b), Some(0.0));
        assert_eq!(matrix.precision(b), None);
        assert_abs_diff_eq!(matrix.precision(a).unwrap(), 2.0 / 3.0);
        assert_eq!(matrix.recall(a), Some(1.0));
        assert_eq!(matrix.f1(b), None);
        assert_eq!(sink.matrices, vec![matrix]);
    }

    #[test]
    fn test_length_mismatch() {
        let test = three_records();
        let a = test.alphabet().label_of("A").unwrap();
        let result = evaluate(&test, &[a, a], CollectingSink::default());
        assert_eq!(
            result,
            Err(EvaluationError::LengthMismatch {
                expected: 3,
                found: 2
            })
        );
    }

    #[test]
    fn test_zero_count_labels_are_covered() {
        let test = Dataset::from_labelled([(1, array![0.0], "A"), (2, array![1.0], "C")]).unwrap();
        let matrix = ConfusionMatrix::new(test.alphabet().clone());
        assert_eq!(matrix.counts().dim(), (2, 2));
        assert_eq!(matrix.accuracy(), None);
        assert_eq!(matrix.class_reports().len(), 2);
    }

    #[test]
    fn test_display_marks_undefined_scores() {
        let test = three_records();
        let a = test.alphabet().label_of("A").unwrap();
        let matrix = evaluate(&test, &[a, a, a], CollectingSink::default()).unwrap();
        let reports = matrix.class_reports();
        assert_eq!(
            reports[1].to_string(),
            "B: precision=undefined recall=0.0000 f1=undefined support=1"
        );
        let table = matrix.to_string();
        assert!(table.contains("accuracy: 0.6667 (2/3)"));
    }
}
