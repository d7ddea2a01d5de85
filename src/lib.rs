//! k-NN classification of the MAGIC gamma telescope data.
//!
//! This crate wires the building blocks of [`magic_helpers`] and [`k_nn`]
//! into a single run: parse the rows, shuffle and split them, fit a k-NN
//! classifier on the training part and evaluate it on the rest.
//!
//! ```no_run
//! use magic_knn::{Pipeline, PipelineConfig, TracingSink};
//!
//! let rows = std::fs::read_to_string("magic04.csv").unwrap();
//! let report = Pipeline::new(PipelineConfig::default())
//!     .run(rows.lines(), TracingSink)
//!     .unwrap();
//! println!("{}", report.matrix);
//! ```

pub mod config;
pub mod pipeline;
pub mod summary;

pub use config::{ConfigError, Metric, PipelineConfig, parse_strategy};
pub use pipeline::{Pipeline, PipelineError, PipelineReport};
pub use summary::{ColumnSummary, DatasetSummary, SummaryError, describe};

pub use k_nn::{
    ClassifierState, DEFAULT_LEAF_SIZE, KdTree, KnnClassifier, KnnError, LinearScan, Neighbor,
    NeighborSearch, SearchStrategy,
};
pub use magic_helpers::{
    ClassReport, CollectingSink, ConfusionMatrix, DataError, Dataset, DiagnosticsSink, Distance,
    EvaluationError, Float, L1Dist, L2Dist, LInfDist, Label, LabelAlphabet, LoaderOptions, LpDist,
    ParseError, ParseErrorKind, Record, Split, TracingSink, evaluate, split,
};
