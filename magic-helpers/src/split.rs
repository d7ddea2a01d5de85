use crate::dataset::{DataError, Dataset};
use crate::Float;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_xoshiro::Xoshiro256PlusPlus;
use tracing::debug;

/// A train/test partition of a dataset. Every record of the source lands on
/// exactly one side.
#[derive(Debug, Clone, PartialEq)]
pub struct Split<F: Float> {
    pub train: Dataset<F>,
    pub test: Dataset<F>,
}

impl<F: Float> Split<F> {
    pub fn into_parts(self) -> (Dataset<F>, Dataset<F>) {
        (self.train, self.test)
    }
}

/// Splits `dataset` into a training and a test set.
///
/// Record positions are shuffled with a `Xoshiro256PlusPlus` generator seeded
/// from `seed`, then cut at `round(train_ratio * N)`: the prefix becomes the
/// training set, the suffix the test set. The same seed and ratio always give
/// the same partition.
///
/// # Errors
///
/// Returns `DataError::InvalidRatio` unless `0 < train_ratio < 1`, and
/// `DataError::InsufficientData` when the cut would leave a side empty.
pub fn split<F: Float>(
    dataset: &Dataset<F>,
    train_ratio: f64,
    seed: u64,
) -> Result<Split<F>, DataError> {
    if !(train_ratio > 0.0 && train_ratio < 1.0) {
        return Err(DataError::InvalidRatio(train_ratio));
    }

    let len = dataset.len();
    let cut = (train_ratio * len as f64).round() as usize;
    if cut == 0 || cut >= len {
        return Err(DataError::InsufficientData { len, train_ratio });
    }

    let mut rng = Xoshiro256PlusPlus::seed_from_u64(seed);
    let mut positions: Vec<usize> = (0..len).collect();
    positions.shuffle(&mut rng);

    let (train, test) = positions.split_at(cut);
    debug!(train = train.len(), test = test.len(), seed, "dataset split");
    Ok(Split {
        train: dataset.subset(train),
        test: dataset.subset(test),
    })
}
