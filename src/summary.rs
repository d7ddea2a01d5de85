//! Descriptive statistics over a loaded dataset.

use magic_helpers::{Dataset, Float};
use ndarray::{Array1, Array2, ArrayView1, Axis};
use ndarray_stats::errors::{MinMaxError, QuantileError};
use ndarray_stats::interpolate::Midpoint;
use ndarray_stats::{Quantile1dExt, QuantileExt};
use noisy_float::types::{N64, n64};
use std::fmt::{Display, Formatter};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum SummaryError {
    #[error("column {0:?} has no values")]
    EmptyColumn(String),
    #[error("column {column:?} cannot be ordered: {source}")]
    Unordered {
        column: String,
        #[source]
        source: MinMaxError,
    },
    #[error("column {0:?} holds a value that is not finite")]
    NonFinite(String),
    #[error("median of column {column:?} is undefined: {source}")]
    Median {
        column: String,
        #[source]
        source: QuantileError,
    },
}

/// Statistics of one feature column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary<F> {
    pub name: String,
    pub count: usize,
    pub mean: F,
    /// Sample standard deviation (one delta degree of freedom).
    pub std: F,
    pub min: F,
    pub median: F,
    pub max: F,
}

#[derive(Debug, Clone, PartialEq)]
pub struct DatasetSummary<F> {
    pub columns: Vec<ColumnSummary<F>>,
    /// `(symbol, count)` in alphabet order.
    pub class_counts: Vec<(String, usize)>,
}

/// Summarizes every feature column and counts records per class.
pub fn describe<F: Float>(dataset: &Dataset<F>) -> Result<DatasetSummary<F>, SummaryError> {
    let records = dataset.records();
    let table = Array2::from_shape_fn((records.len(), dataset.n_features()), |(i, j)| {
        records[i].features()[j]
    });

    let columns = dataset
        .feature_names()
        .iter()
        .zip(table.axis_iter(Axis(1)))
        .map(|(name, column)| summarize(name, column))
        .collect::<Result<Vec<_>, _>>()?;

    let mut counts = vec![0usize; dataset.alphabet().len()];
    for label in dataset.labels() {
        counts[label.index()] += 1;
    }
    let class_counts = dataset
        .alphabet()
        .symbols()
        .iter()
        .cloned()
        .zip(counts)
        .collect();

    Ok(DatasetSummary {
        columns,
        class_counts,
    })
}

fn summarize<F: Float>(name: &str, column: ArrayView1<F>) -> Result<ColumnSummary<F>, SummaryError> {
    let mean = column
        .mean()
        .ok_or_else(|| SummaryError::EmptyColumn(name.to_string()))?;
    let std = if column.len() > 1 {
        column.std(F::one())
    } else {
        F::zero()
    };
    let unordered = |source| SummaryError::Unordered {
        column: name.to_string(),
        source,
    };
    let min = *column.min().map_err(unordered)?;
    let max = *column.max().map_err(unordered)?;

    Ok(ColumnSummary {
        name: name.to_string(),
        count: column.len(),
        mean,
        std,
        min,
        median: median(name, column)?,
        max,
    })
}

fn median<F: Float>(name: &str, column: ArrayView1<F>) -> Result<F, SummaryError> {
    let non_finite = || SummaryError::NonFinite(name.to_string());
    let mut values = column
        .iter()
        .map(|v| v.to_f64().and_then(N64::try_new).ok_or_else(non_finite))
        .collect::<Result<Array1<N64>, _>>()?;
    let median = values
        .quantile_mut(n64(0.5), &Midpoint)
        .map_err(|source| SummaryError::Median {
            column: name.to_string(),
            source,
        })?;
    F::from_f64(median.raw()).ok_or_else(non_finite)
}

impl<F: Float> Display for DatasetSummary<F> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{:<12} {:>7} {:>12} {:>12} {:>12} {:>12} {:>12}",
            "column", "count", "mean", "std", "min", "median", "max"
        )?;
        for c in &self.columns {
            writeln!(
                f,
                "{:<12} {:>7} {:>12.4} {:>12.4} {:>12.4} {:>12.4} {:>12.4}",
                c.name, c.count, c.mean, c.std, c.min, c.median, c.max
            )?;
        }
        let classes: Vec<String> = self
            .class_counts
            .iter()
            .map(|(symbol, count)| format!("{symbol}={count}"))
            .collect();
        write!(f, "classes: {}", classes.join(" "))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::array;

    #[test]
    fn test_describe() {
        let dataset = Dataset::from_labelled([
            (1, array![1.0, 10.0], "h"),
            (2, array![2.0, 20.0], "g"),
            (3, array![3.0, 30.0], "g"),
            (4, array![10.0, 40.0], "g"),
        ])
        .unwrap();
        let summary = describe(&dataset).unwrap();

        let first = &summary.columns[0];
        assert_eq!(first.name, "feature_0");
        assert_eq!(first.count, 4);
        assert_abs_diff_eq!(first.mean, 4.0);
        // Squared deviations 9 + 4 + 1 + 36 = 50 over 3 degrees of freedom.
        assert_abs_diff_eq!(first.std, (50.0f64 / 3.0).sqrt(), epsilon = 1e-12);
        assert_abs_diff_eq!(first.min, 1.0);
        assert_abs_diff_eq!(first.median, 2.5);
        assert_abs_diff_eq!(first.max, 10.0);
        assert_abs_diff_eq!(summary.columns[1].median, 25.0);

        assert_eq!(
            summary.class_counts,
            vec![("g".to_string(), 3), ("h".to_string(), 1)]
        );
        let table = summary.to_string();
        assert!(table.starts_with("column"));
        assert!(table.ends_with("classes: g=3 h=1"));
    }

    #[test]
    fn test_single_row_has_zero_std() {
        let dataset = Dataset::from_labelled([(1, array![5.0f32], "g")]).unwrap();
        let summary = describe(&dataset).unwrap();
        assert_eq!(summary.columns[0].std, 0.0);
        assert_eq!(summary.columns[0].median, 5.0);
    }

    #[test]
    fn test_median_interpolates_between_middle_values() {
        let dataset = Dataset::from_labelled([
            (1, array![7.0, -1.0], "g"),
            (2, array![1.0, 4.0], "g"),
            (3, array![3.0, 2.0], "h"),
            (4, array![5.0, 9.0], "h"),
            (5, array![100.0, 0.0], "h"),
            (6, array![-2.0, 3.0], "h"),
        ])
        .unwrap();
        let summary = describe(&dataset).unwrap();
        // Sorted: -2 1 3 5 7 100 and -1 0 2 3 4 9.
        assert_abs_diff_eq!(summary.columns[0].median, 4.0);
        assert_abs_diff_eq!(summary.columns[1].median, 2.5);
    }

    #[test]
    fn test_non_finite_column_is_an_error() {
        let dataset = Dataset::from_labelled([
            (1, array![1.0], "g"),
            (2, array![f64::NAN], "h"),
        ])
        .unwrap();
        assert!(describe(&dataset).is_err());
    }
}
