use crate::KnnError;
use crate::neighbors::{Neighbor, NeighborSearch, training_arity, validate_query};
use magic_helpers::{Distance, Float, Record};
use ndarray::ArrayView1;
use std::fmt::Debug;
use std::hash::Hash;

/// Brute-force search: every query measures the distance to every training
/// record. Serves as the reference the k-d tree is checked against.
#[derive(Debug, Clone)]
pub struct LinearScan<'a, L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    records: &'a [Record<L, F>],
    n_features: usize,
    distance: D,
}

impl<'a, L, F, D> LinearScan<'a, L, F, D>
where
    L: Clone + Eq + Hash + Debug,
    F: Float,
    D: Distance<F>,
{
    /// # Errors
    ///
    /// Returns `KnnError::InconsistentTrainingData` when records differ in
    /// arity.
    pub fn new(records: &'a [Record<L, F>], distance: D) -> Result<Self, KnnError> {
        let n_features = training_arity(records)?;
        Ok(LinearScan {
            records,
            n_features,
            distance,
        })
    }
}

impl<'a, L, F, D> NeighborSearch<'a, L, F> for LinearScan<'a, L, F, D>
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

        // Reduced distances (e.g. squared Euclidean) are enough to rank.
        let mut distances: Vec<(F, usize)> = self
            .records
            .iter()
            .enumerate()
            .map(|(position, record)| (self.distance.rdistance(query, record.features()), position))
            .collect();

        // A stable sort keeps equidistant records in training order.
        distances.sort_by(|a, b| a.0.partial_cmp(&b.0).unwrap_or(std::cmp::Ordering::Equal));

        Ok(distances
            .into_iter()
            .take(k)
            .map(|(rdist, position)| Neighbor {
                record: &self.records[position],
                position,
                distance: self.distance.rdistance_to_distance(rdist),
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use magic_helpers::L2Dist;
    use ndarray::array;

    #[test]
    fn test_all_records_distance_sorted() {
        let records = vec![
            Record::new(0, array![5.0, 0.0], "far"),
            Record::new(1, array![1.0, 0.0], "near"),
            Record::new(2, array![3.0, 0.0], "mid"),
        ];
        let index = LinearScan::new(&records, L2Dist).unwrap();
        let neighbors = index.k_nearest(array![0.0, 0.0].view(), 3).unwrap();
        let ids: Vec<u64> = neighbors.iter().map(|n| n.record.id()).collect();
        assert_eq!(ids, vec![1, 2, 0]);
        assert_abs_diff_eq!(neighbors[2].distance, 5.0);
    }

    #[test]
    fn test_rejects_inconsistent_training_data() {
        let records = vec![
            Record::new(0, array![5.0, 0.0], "a"),
            Record::new(1, array![1.0], "b"),
        ];
        assert!(matches!(
            LinearScan::new(&records, L2Dist),
            Err(KnnError::InconsistentTrainingData {
                position: 1,
                expected: 2,
                found: 1
            })
        ));
    }
}
