use crate::Float;
use ndarray::ArrayView1;

/// A metric over feature vectors.
///
/// Besides the true distance every metric exposes a *reduced* distance: a
/// cheaper, strictly monotone transform of it (the squared distance for L2,
/// the p-th power for Lp). Searches compare reduced distances and only convert
/// the final neighbors back with [`Distance::rdistance_to_distance`].
pub trait Distance<F: Float>: Send + Sync {
    /// Reduced distance between `a` and `b`.
    fn rdistance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F;

    /// Converts a reduced distance back into the true distance.
    fn rdistance_to_distance(&self, rdist: F) -> F;

    /// Reduced distance contributed by a single coordinate gap.
    ///
    /// This is a lower bound on the reduced distance between any two points
    /// whose coordinates on one axis differ by `gap`, and is what space
    /// partitioning indexes prune with.
    fn axis_rdistance(&self, gap: F) -> F;

    /// True distance between `a` and `b`.
    fn distance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        self.rdistance_to_distance(self.rdistance(a, b))
    }
}

/// Manhattan distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct L1Dist;

impl<F: Float> Distance<F> for L1Dist {
    fn rdistance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        a.iter().zip(b.iter()).map(|(&x, &y)| (x - y).abs()).sum()
    }

    fn rdistance_to_distance(&self, rdist: F) -> F {
        rdist
    }

    fn axis_rdistance(&self, gap: F) -> F {
        gap.abs()
    }
}

/// Euclidean distance. The reduced form is the squared distance.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct L2Dist;

impl<F: Float> Distance<F> for L2Dist {
    fn rdistance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| {
                let d = x - y;
                d * d
            })
            .sum()
    }

    fn rdistance_to_distance(&self, rdist: F) -> F {
        rdist.sqrt()
    }

    fn axis_rdistance(&self, gap: F) -> F {
        gap * gap
    }
}

/// Chebyshev distance (largest coordinate difference).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LInfDist;

impl<F: Float> Distance<F> for LInfDist {
    fn rdistance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| (x - y).abs())
            .fold(F::zero(), F::max)
    }

    fn rdistance_to_distance(&self, rdist: F) -> F {
        rdist
    }

    fn axis_rdistance(&self, gap: F) -> F {
        gap.abs()
    }
}

/// Minkowski distance of order `p` (`p >= 1`).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LpDist<F: Float>(pub F);

impl<F: Float> Distance<F> for LpDist<F> {
    fn rdistance(&self, a: ArrayView1<F>, b: ArrayView1<F>) -> F {
        a.iter()
            .zip(b.iter())
            .map(|(&x, &y)| (x - y).abs().powf(self.0))
            .sum()
    }

    fn rdistance_to_distance(&self, rdist: F) -> F {
        rdist.powf(self.0.recip())
    }

    fn axis_rdistance(&self, gap: F) -> F {
        gap.abs().powf(self.0)
    }
}
