//! End-to-end run: load → split → fit → predict → evaluate.

use crate::config::{ConfigError, Metric, PipelineConfig};
use k_nn::{KnnClassifier, KnnError};
use magic_helpers::{
    ConfusionMatrix, DataError, Dataset, DiagnosticsSink, Distance, EvaluationError, L1Dist,
    L2Dist, LInfDist, Label, ParseError, Split, evaluate, split as split_dataset,
};
use thiserror::Error;
use tracing::{info, info_span};

/// A failed run, tagged with the stage that failed.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("load stage failed: {source}")]
    Load { source: DataError },
    #[error("split stage failed: {source}")]
    Split { source: DataError },
    #[error("fit stage failed: {source}")]
    Fit { source: KnnError },
    #[error("predict stage failed: {source}")]
    Predict { source: KnnError },
    #[error("evaluate stage failed: {source}")]
    Evaluate { source: EvaluationError },
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Config(_) => "config",
            PipelineError::Load { .. } => "load",
            PipelineError::Split { .. } => "split",
            PipelineError::Fit { .. } => "fit",
            PipelineError::Predict { .. } => "predict",
            PipelineError::Evaluate { .. } => "evaluate",
        }
    }
}

/// Everything a successful run produced.
#[derive(Debug, Clone)]
pub struct PipelineReport {
    /// The full dataset, as loaded.
    pub dataset: Dataset<f64>,
    pub split: Split<f64>,
    /// One prediction per test record, in test order.
    pub predictions: Vec<Label>,
    pub matrix: ConfusionMatrix,
    /// Rows dropped by the loader.
    pub skipped_rows: usize,
}

impl PipelineReport {
    /// `(id, true symbol, predicted symbol)` for every test record, in test
    /// order.
    pub fn labelled_predictions(&self) -> Vec<(u64, &str, &str)> {
        let alphabet = self.split.test.alphabet();
        self.split
            .test
            .iter()
            .zip(&self.predictions)
            .map(|(record, &predicted)| {
                (
                    record.id(),
                    self.split.test.symbol_of(record),
                    alphabet.symbol(predicted).unwrap_or("?"),
                )
            })
            .collect()
    }
}

/// Counts skipped rows on their way to the caller's sink.
struct Counting<K> {
    inner: K,
    skipped: usize,
}

impl<K: DiagnosticsSink> DiagnosticsSink for Counting<K> {
    fn row_skipped(&mut self, error: &ParseError) {
        self.skipped += 1;
        self.inner.row_skipped(error);
    }

    fn evaluated(&mut self, matrix: &ConfusionMatrix) {
        self.inner.evaluated(matrix);
    }
}

#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Self {
        Pipeline { config }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Runs every stage over `rows`, reporting diagnostics to `sink`.
    ///
    /// # Errors
    ///
    /// Any stage failure aborts the run; no partial report is returned.
    pub fn run<I, S, K>(&self, rows: I, sink: K) -> Result<PipelineReport, PipelineError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
        K: DiagnosticsSink,
    {
        self.config.validate()?;
        let mut sink = Counting {
            inner: sink,
            skipped: 0,
        };

        let dataset = {
            let _span = info_span!("load").entered();
            let dataset = Dataset::<f64>::load(rows, self.config.loader_options()?, &mut sink)
                .map_err(|source| PipelineError::Load { source })?;
            info!(
                records = dataset.len(),
                skipped = sink.skipped,
                classes = ?dataset.alphabet().symbols(),
                "dataset loaded"
            );
            dataset
        };

        let split = {
            let _span = info_span!("split").entered();
            let split = split_dataset(&dataset, self.config.train_ratio, self.config.seed)
                .map_err(|source| PipelineError::Split { source })?;
            info!(
                train = split.train.len(),
                test = split.test.len(),
                "dataset split"
            );
            split
        };

        let predictions = match self.config.metric {
            Metric::Euclidean => self.classify(&split, L2Dist)?,
            Metric::Manhattan => self.classify(&split, L1Dist)?,
            Metric::Chebyshev => self.classify(&split, LInfDist)?,
        };

        let matrix = {
            let _span = info_span!("evaluate").entered();
            evaluate(&split.test, &predictions, &mut sink)
                .map_err(|source| PipelineError::Evaluate { source })?
        };

        Ok(PipelineReport {
            dataset,
            split,
            predictions,
            matrix,
            skipped_rows: sink.skipped,
        })
    }

    fn classify<D: Distance<f64>>(
        &self,
        split: &Split<f64>,
        distance: D,
    ) -> Result<Vec<Label>, PipelineError> {
        let mut classifier = KnnClassifier::with_strategy(self.config.strategy);
        {
            let _span = info_span!("fit", k = self.config.k, metric = %self.config.metric).entered();
            classifier
                .fit_dataset(&split.train, self.config.k, distance)
                .map_err(|source| PipelineError::Fit { source })?;
        }

        let _span = info_span!("predict", records = split.test.len()).entered();
        let predictions = classifier
            .predict_dataset(&split.test)
            .map_err(|source| PipelineError::Predict { source })?;
        info!(predictions = predictions.len(), "test set classified");
        Ok(predictions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use k_nn::SearchStrategy;
    use magic_helpers::CollectingSink;

    fn rows() -> Vec<String> {
        let mut rows = vec!["ID,x:,y:,class:".to_string()];
        for i in 0..20 {
            let (x, label) = if i % 2 == 0 {
                (i as f64 * 0.1, "g")
            } else {
                (50.0 + i as f64, "h")
            };
            rows.push(format!("{i},{x},{x},{label}"));
        }
        rows.push("99,oops,1,g".to_string());
        rows
    }

    fn base_config() -> PipelineConfig {
        PipelineConfig {
            n_features: 2,
            k: 3,
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_pipeline_separable_data() {
        let mut sink = CollectingSink::default();
        let report = Pipeline::new(base_config()).run(rows(), &mut sink).unwrap();

        assert_eq!(report.dataset.len(), 20);
        assert_eq!(report.skipped_rows, 1);
        assert_eq!(sink.skipped.len(), 1);
        assert_eq!(sink.skipped[0].row, 20);
        assert_eq!(report.split.train.len(), 14);
        assert_eq!(report.split.test.len(), 6);
        assert_eq!(report.predictions.len(), 6);
        assert_eq!(report.matrix.total(), 6);
        assert_eq!(report.matrix.accuracy(), Some(1.0));
        assert_eq!(sink.matrices.len(), 1);

        let labelled = report.labelled_predictions();
        assert_eq!(labelled.len(), 6);
        for ((id, truth, predicted), record) in labelled.iter().zip(report.split.test.iter()) {
            assert_eq!(*id, record.id());
            // Even ids are `g`, odd ids `h`, and the clusters are separable.
            let expected = if id % 2 == 0 { "g" } else { "h" };
            assert_eq!(*truth, expected);
            assert_eq!(*predicted, expected);
        }
    }

    #[test]
    fn test_strategies_and_metrics_agree_on_separable_data() {
        for strategy in [SearchStrategy::Linear, SearchStrategy::KdTree { leaf_size: 2 }] {
            for metric in [Metric::Euclidean, Metric::Manhattan, Metric::Chebyshev] {
                let config = PipelineConfig {
                    strategy,
                    metric,
                    ..base_config()
                };
                let report = Pipeline::new(config).run(rows(), CollectingSink::default()).unwrap();
                assert_eq!(report.matrix.accuracy(), Some(1.0));
            }
        }
    }

    #[test]
    fn test_errors_carry_stage() {
        let config = PipelineConfig {
            train_ratio: 1.5,
            ..base_config()
        };
        let err = Pipeline::new(config).run(rows(), CollectingSink::default()).unwrap_err();
        assert_eq!(err.stage(), "split");
        assert!(matches!(
            err,
            PipelineError::Split {
                source: DataError::InvalidRatio(_)
            }
        ));

        let too_many = PipelineConfig {
            k: 20,
            ..base_config()
        };
        let err = Pipeline::new(too_many).run(rows(), CollectingSink::default()).unwrap_err();
        assert_eq!(err.stage(), "fit");

        let err = Pipeline::new(base_config())
            .run(["ID,x,y,class"], CollectingSink::default())
            .unwrap_err();
        assert_eq!(err.stage(), "load");
    }
}
