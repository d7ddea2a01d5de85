use ndarray::{NdFloat, ScalarOperand};

use num_traits::{AsPrimitive, FromPrimitive, NumCast, Signed};
use rand::distr::uniform::SampleUniform;

use std::iter::Sum;
use std::ops::{AddAssign, DivAssign, MulAssign, SubAssign};

// Include submodules
mod common;
mod dataset;
mod diagnostics;
mod distance;
mod evaluation;
mod label;
mod split;

// Re-export types from submodules
pub use common::Record;
pub use dataset::{DataError, Dataset, LoaderOptions, ParseError, ParseErrorKind};
pub use diagnostics::{CollectingSink, DiagnosticsSink, TracingSink};
pub use distance::{Distance, L1Dist, L2Dist, LInfDist, LpDist};
pub use evaluation::{ClassReport, ConfusionMatrix, EvaluationError, evaluate};
pub use label::{Label, LabelAlphabet};
pub use split::{Split, split};

pub trait Float:
    NdFloat
    + FromPrimitive
    + Default
    + Signed
    + Sum
    + AsPrimitive<usize>
    + for<'a> AddAssign<&'a Self>
    + for<'a> MulAssign<&'a Self>
    + for<'a> SubAssign<&'a Self>
    + for<'a> DivAssign<&'a Self>
    + num_traits::MulAdd<Output = Self>
    + SampleUniform
    + ScalarOperand
    + std::marker::Unpin
{
    fn cast<T: NumCast>(x: T) -> Option<Self> {
        NumCast::from(x)
    }
}

impl Float for f32 {}

impl Float for f64 {}
