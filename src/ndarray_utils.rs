//! A collection of various utilities needed in this library.
//! The two main groups are conversions of magnitude columns into `ndarray`,
//! inspired by [`nshare`](https://github.com/rust-cv/nshare);
//! and common operations on arrays.

use nalgebra::{DVector, Scalar};
use ndarray::{Array1, ArrayView1};

use crate::Float;

/// Anything that can be turned into a one-dimensional array of magnitudes.
pub trait IntoNdarray1 {
    /// The resulting array type.
    type Out;

    /// Perform the conversion.
    fn into_ndarray1(self) -> Self::Out;
}

impl<N: Scalar> IntoNdarray1 for Array1<N> {
    type Out = Array1<N>;

    fn into_ndarray1(self) -> Self::Out {
        self
    }
}

impl<N: Scalar> IntoNdarray1 for Vec<N> {
    type Out = Array1<N>;

    fn into_ndarray1(self) -> Self::Out {
        Array1::from_vec(self)
    }
}

impl<N: Scalar> IntoNdarray1 for &[N] {
    type Out = Array1<N>;

    fn into_ndarray1(self) -> Self::Out {
        Array1::from(self.to_vec())
    }
}

impl<N: Scalar> IntoNdarray1 for DVector<N> {
    type Out = Array1<N>;

    fn into_ndarray1(self) -> Self::Out {
        self.iter().cloned().collect()
    }
}

/// Index of the smallest finite value, or `None` if there is none.
///
/// The first index wins on ties.
pub(crate) fn argmin<F: Float>(arr: ArrayView1<'_, F>) -> Option<usize> {
    arr.indexed_iter()
        .filter(|(_, value)| value.is_finite())
        .reduce(|acc, f| if f.1 < acc.1 { f } else { acc })
        .map(|(index, _)| index)
}
