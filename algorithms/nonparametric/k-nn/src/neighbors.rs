use crate::KnnError;
use magic_helpers::{Float, Record};
use ndarray::ArrayView1;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;
use std::hash::Hash;

/// A training record returned by a neighbor query.
#[derive(Debug, Clone, PartialEq)]
pub struct Neighbor<'a, L, F>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
{
    pub record: &'a Record<L, F>,
    /// Position of the record in the training slice the index was built from.
    pub position: usize,
    /// True (not reduced) distance to the query.
    pub distance: F,
}

/// Read-only nearest-neighbor search over a borrowed training set.
pub trait NeighborSearch<'a, L, F>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
{
    /// Number of indexed training records.
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Arity every query must have.
    fn n_features(&self) -> usize;

    /// The `k` training records closest to `query`, nearest first.
    ///
    /// Equidistant records are ordered by their position in the training
    /// slice, lower first, so identical inputs always give identical answers.
    ///
    /// # Errors
    ///
    /// `KnnError::InvalidK` for `k == 0`, `KnnError::InsufficientTrainingData`
    /// when fewer than `k` records are indexed, `KnnError::DimensionMismatch`
    /// and `KnnError::NonFiniteQuery` for malformed queries.
    fn k_nearest(&self, query: ArrayView1<F>, k: usize)
    -> Result<Vec<Neighbor<'a, L, F>>, KnnError>;
}

pub(crate) fn validate_query<F: Float>(
    query: ArrayView1<F>,
    n_features: usize,
    available: usize,
    k: usize,
) -> Result<(), KnnError> {
    if k == 0 {
        return Err(KnnError::InvalidK);
    }
    if available < k {
        return Err(KnnError::InsufficientTrainingData { k, available });
    }
    if query.len() != n_features {
        return Err(KnnError::DimensionMismatch {
            expected: n_features,
            found: query.len(),
        });
    }
    if query.iter().any(|v| !v.is_finite()) {
        return Err(KnnError::NonFiniteQuery);
    }
    Ok(())
}

/// Checks that every training record has the same arity and returns it.
pub(crate) fn training_arity<L, F>(records: &[Record<L, F>]) -> Result<usize, KnnError>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
{
    let expected = records.first().map_or(0, Record::arity);
    match records.iter().position(|r| r.arity() != expected) {
        Some(position) => Err(KnnError::InconsistentTrainingData {
            position,
            expected,
            found: records[position].arity(),
        }),
        None => Ok(expected),
    }
}

#[derive(Debug, Clone, Copy)]
pub(crate) struct Candidate<F> {
    pub rdist: F,
    pub position: usize,
}

impl<F: Float> Ord for Candidate<F> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rdist
            .partial_cmp(&other.rdist)
            .unwrap_or(Ordering::Equal)
            .then(self.position.cmp(&other.position))
    }
}

impl<F: Float> PartialOrd for Candidate<F> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<F: Float> PartialEq for Candidate<F> {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<F: Float> Eq for Candidate<F> {}

/// The `k` best candidates seen so far. The heap top is the current worst.
pub(crate) struct KBest<F> {
    k: usize,
    heap: BinaryHeap<Candidate<F>>,
}

impl<F: Float> KBest<F> {
    pub fn new(k: usize) -> Self {
        KBest {
            k,
            heap: BinaryHeap::with_capacity(k + 1),
        }
    }

    pub fn offer(&mut self, rdist: F, position: usize) {
        let candidate = Candidate { rdist, position };
        if self.heap.len() < self.k {
            self.heap.push(candidate);
        } else if self.heap.peek().is_some_and(|worst| candidate < *worst) {
            self.heap.pop();
            self.heap.push(candidate);
        }
    }

    /// Whether a region whose reduced distance is at least `bound` can be
    /// skipped. Regions exactly at the current worst distance are still
    /// visited, since they may hold an equidistant record with a lower
    /// position.
    pub fn can_prune(&self, bound: F) -> bool {
        self.heap.len() == self.k && self.heap.peek().is_some_and(|worst| bound > worst.rdist)
    }

    /// Candidates, nearest first.
    pub fn into_sorted(self) -> Vec<Candidate<F>> {
        self.heap.into_sorted_vec()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kbest_keeps_lowest_positions_on_ties() {
        let mut best = KBest::new(2);
        best.offer(1.0, 5);
        best.offer(1.0, 3);
        best.offer(1.0, 4);
        best.offer(0.5, 9);
        let kept: Vec<usize> = best.into_sorted().iter().map(|c| c.position).collect();
        assert_eq!(kept, vec![9, 3]);
    }

    #[test]
    fn test_pruning_only_beyond_worst() {
        let mut best = KBest::new(1);
        assert!(!best.can_prune(100.0));
        best.offer(2.0, 0);
        assert!(!best.can_prune(2.0));
        assert!(best.can_prune(2.5));
    }
}
