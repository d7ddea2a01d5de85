use crate::Float;
use ndarray::{Array1, ArrayView1};
use std::fmt::Debug;

#[cfg(feature = "serde")]
use serde_crate::{Deserialize, Serialize};

/// One observation: an identifier, its feature vector and its label.
///
/// L: The type of the label (e.g., `Label`, `&str`, an enum).
/// F: The float type for the features (e.g., f32, f64).
///
/// Records are immutable once built; the fields are only reachable through
/// accessors.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(Serialize, Deserialize),
    serde(crate = "serde_crate")
)]
pub struct Record<L, F>
where
    L: Clone + Eq + std::hash::Hash + Debug,
    F: Float,
{
    id: u64,
    features: Array1<F>,
    label: L,
}

impl<L, F> Record<L, F>
where
    L: Clone + Eq + std::hash::Hash + Debug,
    F: Float,
{
    pub fn new(id: u64, features: Array1<F>, label: L) -> Self {
        Record {
            id,
            features,
            label,
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn features(&self) -> ArrayView1<'_, F> {
        self.features.view()
    }

    pub fn label(&self) -> &L {
        &self.label
    }

    /// Number of features carried by this record.
    pub fn arity(&self) -> usize {
        self.features.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_accessors() {
        let record = Record::new(7, array![1.0, 2.0, 3.0], "g");
        assert_eq!(record.id(), 7);
        assert_eq!(record.arity(), 3);
        assert_eq!(record.features()[1], 2.0);
        assert_eq!(*record.label(), "g");
    }
}
