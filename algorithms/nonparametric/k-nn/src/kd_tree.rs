//! A k-d tree over borrowed training records.
//!
//! The tree never owns records: it keeps a permutation of their positions in
//! the training slice and a flat arena of nodes. Each internal node splits
//! its positions at the median of the axis with the widest spread, so the
//! tree is balanced and construction is `O(N log N)` on average. Queries are
//! exact for any tree shape; pruning only changes how much of the tree is
//! visited.

use crate::KnnError;
use crate::neighbors::{KBest, Neighbor, NeighborSearch, training_arity, validate_query};
use magic_helpers::{Distance, Float, Record};
use ndarray::ArrayView1;
use std::cmp::Ordering;
use std::fmt::Debug;
use std::hash::Hash;
use tracing::debug;

/// Default maximum number of records per leaf.
pub const DEFAULT_LEAF_SIZE: usize = 16;

#[derive(Debug, Clone, Copy)]
enum Node<F> {
    /// Positions `positions[start..end]` are scanned directly.
    Leaf { start: usize, end: usize },
    /// Records in `left` have `coord <= value` on `axis`, records in `right`
    /// have `coord >= value`.
    Split {
        axis: usize,
        value: F,
        left: usize,
        right: usize,
    },
}

#[derive(Debug, Clone)]
pub struct KdTree<'a, L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    records: &'a [Record<L, F>],
    positions: Vec<usize>,
    nodes: Vec<Node<F>>,
    n_features: usize,
    distance: D,
}

impl<'a, L, F, D> KdTree<'a, L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    /// Builds the tree over `records`. A `leaf_size` of 0 is treated as 1.
    ///
    /// # Errors
    ///
    /// Returns `KnnError::InconsistentTrainingData` when records differ in
    /// arity.
    pub fn build(
        records: &'a [Record<L, F>],
        distance: D,
        leaf_size: usize,
    ) -> Result<Self, KnnError> {
        let n_features = training_arity(records)?;
        let mut positions: Vec<usize> = (0..records.len()).collect();
        let mut nodes = Vec::new();
        if !records.is_empty() {
            build_node(records, &mut positions, 0, leaf_size.max(1), &mut nodes);
        }
        debug!(
            records = records.len(),
            nodes = nodes.len(),
            n_features,
            "k-d tree built"
        );
        Ok(KdTree {
            records,
            positions,
            nodes,
            n_features,
            distance,
        })
    }

    fn search(&self, node: usize, query: ArrayView1<F>, best: &mut KBest<F>) {
        match self.nodes[node] {
            Node::Leaf { start, end } => {
                for &position in &self.positions[start..end] {
                    let rdist = self
                        .distance
                        .rdistance(query, self.records[position].features());
                    best.offer(rdist, position);
                }
            }
            Node::Split {
                axis,
                value,
                left,
                right,
            } => {
                let gap = query[axis] - value;
                let (near, far) = if gap < F::zero() {
                    (left, right)
                } else {
                    (right, left)
                };
                self.search(near, query, best);
                if !best.can_prune(self.distance.axis_rdistance(gap)) {
                    self.search(far, query, best);
                }
            }
        }
    }
}

/// Builds the subtree for `positions` (which start at `offset` in the full
/// permutation) and returns its node index.
fn build_node<L, F>(
    records: &[Record<L, F>],
    positions: &mut [usize],
    offset: usize,
    leaf_size: usize,
    nodes: &mut Vec<Node<F>>,
) -> usize
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
{
    let index = nodes.len();
    let len = positions.len();
    nodes.push(Node::Leaf {
        start: offset,
        end: offset + len,
    });
    if len <= leaf_size {
        return index;
    }

    let Some(axis) = widest_axis(records, positions) else {
        // Every record here is the same point.
        return index;
    };

    let coord = |position: usize| records[position].features()[axis];
    let mid = len / 2;
    positions.select_nth_unstable_by(mid, |&a, &b| {
        coord(a).partial_cmp(&coord(b)).unwrap_or(Ordering::Equal)
    });
    let value = coord(positions[mid]);

    let (lower, upper) = positions.split_at_mut(mid);
    let left = build_node(records, lower, offset, leaf_size, nodes);
    let right = build_node(records, upper, offset + mid, leaf_size, nodes);
    nodes[index] = Node::Split {
        axis,
        value,
        left,
        right,
    };
    index
}

/// The axis with the largest coordinate range, or `None` if all ranges are 0.
fn widest_axis<L, F>(records: &[Record<L, F>], positions: &[usize]) -> Option<usize>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
{
    let n_features = records[positions[0]].arity();
    let mut widest: Option<(usize, F)> = None;
    for axis in 0..n_features {
        let (lo, hi) = positions.iter().fold(
            (F::infinity(), F::neg_infinity()),
            |(lo, hi), &p| {
                let v = records[p].features()[axis];
                (lo.min(v), hi.max(v))
            },
        );
        let spread = hi - lo;
        if spread > F::zero() && widest.is_none_or(|(_, s)| spread > s) {
            widest = Some((axis, spread));
        }
    }
    widest.map(|(axis, _)| axis)
}

impl<'a, L, F, D> NeighborSearch<'a, L, F> for KdTree<'a, L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    fn len(&self) -> usize {
        self.records.len()
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn k_nearest(
        &self,
        query: ArrayView1<F>,
        k: usize,
    ) -> Result<Vec<Neighbor<'a, L, F>>, KnnError> {
        validate_query(query, self.n_features, self.records.len(), k)?;

        let mut best = KBest::new(k);
        self.search(0, query, &mut best);

        Ok(best
            .into_sorted()
            .into_iter()
            .map(|c| Neighbor {
                record: &self.records[c.position],
                position: c.position,
                distance: self.distance.rdistance_to_distance(c.rdist),
            })
            .collect())
    }
}
