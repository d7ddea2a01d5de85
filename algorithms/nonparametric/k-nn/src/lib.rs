use std::collections::HashMap;
use std::fmt::Debug;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};
// These are the core components from our shared library.
use magic_helpers::{Dataset, Distance, Float, Label, Record};

// ndarray is used in the public function signatures.
use ndarray::ArrayView1;
use thiserror::Error;
use tracing::debug;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

mod kd_tree;
mod linear;
mod neighbors;

pub use kd_tree::{DEFAULT_LEAF_SIZE, KdTree};
pub use linear::LinearScan;
pub use neighbors::{Neighbor, NeighborSearch};

/// Errors that can occur when using the k-NN classifier.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum KnnError {
    /// k cannot be zero for a k-NN classifier
    #[error("k cannot be zero for a k-NN classifier")]
    InvalidK,
    /// Fewer training records than neighbors requested
    #[error("k = {k} neighbors requested but the training set holds {available} records")]
    InsufficientTrainingData { k: usize, available: usize },
    /// `predict` was called before `fit`
    #[error("the classifier must be fitted before it can predict")]
    NotFitted,
    /// `fit` was called on a classifier that is already fitted
    #[error("the classifier is already fitted; create a new one to fit again")]
    AlreadyFitted,
    /// Training records do not all share one arity
    #[error("training record at position {position} has {found} features, expected {expected}")]
    InconsistentTrainingData {
        position: usize,
        expected: usize,
        found: usize,
    },
    /// Query arity differs from the training arity
    #[error("query has {found} features but the index was built with {expected}")]
    DimensionMismatch { expected: usize, found: usize },
    /// Query contains NaN or an infinity
    #[error("query contains a non-finite feature value")]
    NonFiniteQuery,
    /// One record of a batch could not be classified
    #[error("prediction failed for record at position {position}: {source}")]
    BatchItem {
        position: usize,
        #[source]
        source: Box<KnnError>,
    },
}

/// How the classifier searches its training set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub enum SearchStrategy {
    /// A k-d tree with at most `leaf_size` records per leaf.
    KdTree { leaf_size: usize },
    /// Brute-force scan over every training record.
    Linear,
}

impl Default for SearchStrategy {
    fn default() -> Self {
        SearchStrategy::KdTree {
            leaf_size: DEFAULT_LEAF_SIZE,
        }
    }
}

/// Observable lifecycle of a [`KnnClassifier`].
///
/// `Unfit -> Fit -> Predicting`; there is no way back to `Unfit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassifierState {
    Unfit,
    Fit,
    Predicting,
}

#[derive(Debug, Clone)]
enum Index<'a, L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    KdTree(KdTree<'a, L, F, D>),
    Linear(LinearScan<'a, L, F, D>),
}

impl<'a, L, F, D> Index<'a, L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    fn search(&self) -> &dyn NeighborSearch<'a, L, F> {
        match self {
            Index::KdTree(tree) => tree,
            Index::Linear(scan) => scan,
        }
    }
}

#[derive(Debug)]
struct Model<'a, L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    k: usize,
    index: Index<'a, L, F, D>,
}

/// A k-Nearest Neighbors (k-NN) classifier.
///
/// This classifier predicts the label of a new data point by finding the `k`
/// most similar points in its training set and taking a majority vote among
/// their labels. Vote ties go to the label whose neighbors have the smaller
/// total distance, and if that ties too, to the smaller label in `Ord` order
/// (for [`Label`] that is the lexicographically first symbol).
///
/// The training records are borrowed, not copied: the classifier lives no
/// longer than the training set it was fitted on.
///
/// # Type Parameters
///
/// * `L`: The type of the label (e.g., `Label`, `&str`, or a custom `enum`).
/// * `F`: The float type for the features (e.g., `f32`, `f64`).
/// * `D`: The distance metric, which must implement the `Distance` trait.
#[derive(Debug)]
pub struct KnnClassifier<'a, L, F, D>
where
    L: Clone + Eq + Hash + Debug + Ord,
    F: Float,
    D: Distance<F>,
{
    strategy: SearchStrategy,
    model: Option<Model<'a, L, F, D>>,
    predicting: AtomicBool,
}

impl<'a, L, F, D> Default for KnnClassifier<'a, L, F, D>
where
    L: Clone + Eq + Hash + Debug + Ord,
    F: Float,
    D: Distance<F>,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<'a, L, F, D> KnnClassifier<'a, L, F, D>
where
    L: Clone + Eq + Hash + Debug + Ord,
    F: Float,
    D: Distance<F>,
{
    /// Creates an unfitted classifier backed by a k-d tree.
    pub fn new() -> Self {
        Self::with_strategy(SearchStrategy::default())
    }

    /// Creates an unfitted classifier using the given search strategy.
    pub fn with_strategy(strategy: SearchStrategy) -> Self {
        Self {
            strategy,
            model: None,
            predicting: AtomicBool::new(false),
        }
    }

    pub fn state(&self) -> ClassifierState {
        match (&self.model, self.predicting.load(AtomicOrdering::Relaxed)) {
            (None, _) => ClassifierState::Unfit,
            (Some(_), false) => ClassifierState::Fit,
            (Some(_), true) => ClassifierState::Predicting,
        }
    }

    pub fn strategy(&self) -> SearchStrategy {
        self.strategy
    }

    /// The `k` the classifier was fitted with.
    pub fn k(&self) -> Option<usize> {
        self.model.as_ref().map(|m| m.k)
    }

    /// Builds the search index over `training_data`.
    ///
    /// # Arguments
    ///
    /// * `training_data`: The records the classifier will learn from.
    /// * `k`: The number of neighbors to consider for classification. Must be greater than 0.
    /// * `distance`: An instance of a struct that implements the `Distance` trait (e.g., `L2Dist`).
    ///
    /// # Errors
    ///
    /// Returns `KnnError::AlreadyFitted` on a fitted classifier,
    /// `KnnError::InvalidK` if `k` is 0, `KnnError::InsufficientTrainingData`
    /// if there are fewer than `k` records and
    /// `KnnError::InconsistentTrainingData` on mixed arities.
    pub fn fit(
        &mut self,
        training_data: &'a [Record<L, F>],
        k: usize,
        distance: D,
    ) -> Result<(), KnnError> {
        if self.model.is_some() {
            return Err(KnnError::AlreadyFitted);
        }
        if k == 0 {
            return Err(KnnError::InvalidK);
        }
        if training_data.len() < k {
            return Err(KnnError::InsufficientTrainingData {
                k,
                available: training_data.len(),
            });
        }

        let index = match self.strategy {
            SearchStrategy::KdTree { leaf_size } => {
                Index::KdTree(KdTree::build(training_data, distance, leaf_size)?)
            }
            SearchStrategy::Linear => Index::Linear(LinearScan::new(training_data, distance)?),
        };
        debug!(
            k,
            records = training_data.len(),
            strategy = ?self.strategy,
            "k-NN classifier fitted"
        );
        self.model = Some(Model { k, index });
        Ok(())
    }

    fn model(&self) -> Result<&Model<'a, L, F, D>, KnnError> {
        self.model.as_ref().ok_or(KnnError::NotFitted)
    }

    /// The `k` training records nearest to `features`, nearest first.
    pub fn k_nearest(
        &self,
        features: ArrayView1<F>,
        k: usize,
    ) -> Result<Vec<Neighbor<'a, L, F>>, KnnError> {
        self.model()?.index.search().k_nearest(features, k)
    }

    /// Predicts the label for a new, unseen data point.
    ///
    /// # Errors
    ///
    /// Returns `KnnError::NotFitted` before `fit`, and the query errors of
    /// [`NeighborSearch::k_nearest`] for malformed features.
    pub fn predict(&self, features: ArrayView1<F>) -> Result<L, KnnError> {
        let model = self.model()?;
        let neighbors = model.index.search().k_nearest(features, model.k)?;
        // k_nearest yields exactly k >= 1 neighbors; an empty list means k = 0.
        let (nearest, rest) = neighbors.split_first().ok_or(KnnError::InvalidK)?;
        self.predicting.store(true, AtomicOrdering::Relaxed);
        Ok(majority_vote(nearest, rest))
    }

    pub fn predict_record(&self, record: &Record<L, F>) -> Result<L, KnnError> {
        self.predict(record.features())
    }

    fn predict_at(&self, position: usize, record: &Record<L, F>) -> Result<L, KnnError> {
        self.predict_record(record)
            .map_err(|source| KnnError::BatchItem {
                position,
                source: Box::new(source),
            })
    }

    /// Predicts one label per record, in input order.
    ///
    /// # Errors
    ///
    /// Fails as a whole on the first record that cannot be classified,
    /// reporting its position as `KnnError::BatchItem`.
    #[cfg(not(feature = "rayon"))]
    pub fn predict_batch(&self, records: &[Record<L, F>]) -> Result<Vec<L>, KnnError> {
        self.model()?;
        records
            .iter()
            .enumerate()
            .map(|(position, record)| self.predict_at(position, record))
            .collect()
    }

    /// Predicts one label per record, in input order, querying in parallel.
    ///
    /// # Errors
    ///
    /// Fails as a whole on the lowest-positioned record that cannot be
    /// classified, reporting its position as `KnnError::BatchItem`.
    #[cfg(feature = "rayon")]
    pub fn predict_batch(&self, records: &[Record<L, F>]) -> Result<Vec<L>, KnnError>
    where
        L: Send + Sync,
    {
        use rayon::prelude::*;

        self.model()?;
        let results: Vec<Result<L, KnnError>> = records
            .par_iter()
            .enumerate()
            .map(|(position, record)| self.predict_at(position, record))
            .collect();
        results.into_iter().collect()
    }
}

impl<'a, F, D> KnnClassifier<'a, Label, F, D>
where
    F: Float,
    D: Distance<F>,
{
    /// Fits on every record of `train`.
    pub fn fit_dataset(&mut self, train: &'a Dataset<F>, k: usize, distance: D) -> Result<(), KnnError> {
        self.fit(train.records(), k, distance)
    }

    /// Predicts a label for every record of `test`, aligned with its records.
    pub fn predict_dataset(&self, test: &Dataset<F>) -> Result<Vec<Label>, KnnError> {
        self.predict_batch(test.records())
    }
}

/// Majority vote with deterministic tie-breaking: most votes, then smallest
/// distance sum, then smallest label.
fn majority_vote<L, F>(nearest: &Neighbor<'_, L, F>, rest: &[Neighbor<'_, L, F>]) -> L
where
    L: Clone + Eq + Hash + Debug + Ord,
    F: Float,
{
    let mut votes: HashMap<&L, (usize, F)> = HashMap::new();
    for neighbor in std::iter::once(nearest).chain(rest) {
        let entry = votes
            .entry(neighbor.record.label())
            .or_insert((0, F::zero()));
        entry.0 += 1;
        entry.1 += neighbor.distance;
    }

    votes
        .into_iter()
        .min_by(|(label_a, (count_a, dist_a)), (label_b, (count_b, dist_b))| {
            count_b
                .cmp(count_a)
                .then(dist_a.partial_cmp(dist_b).unwrap_or(std::cmp::Ordering::Equal))
                .then(label_a.cmp(label_b))
        })
        .map_or_else(|| nearest.record.label().clone(), |(label, _)| label.clone())
}
