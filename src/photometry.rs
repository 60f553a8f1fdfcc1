//! Photometric calibration of instrumental aperture magnitudes.

use ndarray::Array1;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::ndarray_utils::IntoNdarray1;
use crate::{Float, lit};

/// Instrumental zero point of ACS/WFC F555W.
pub const F555W_ZERO_POINT: f64 = 25.255;
/// Instrumental zero point of ACS/WFC F814W.
pub const F814W_ZERO_POINT: f64 = 24.849;

/// Corrections of one photometric band.
///
/// A calibrated magnitude is `m + zero_point - aperture_correction - extinction`.
/// The default is the identity.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct BandCalibration<F: Float> {
    /// Additive zero point.
    pub zero_point: F,
    /// Flux lost outside the aperture, in magnitudes.
    pub aperture_correction: F,
    /// Interstellar extinction along the line of sight, in magnitudes.
    pub extinction: F,
}

impl<F: Float> BandCalibration<F> {
    /// Create a new calibration.
    pub fn new(zero_point: F, aperture_correction: F, extinction: F) -> Self {
        Self {
            zero_point,
            aperture_correction,
            extinction,
        }
    }

    /// F555W as used in the reference reduction.
    ///
    /// The zero point is left at 0 there, so magnitudes stay instrumental;
    /// use [`with_zero_point`](Self::with_zero_point()) with [`F555W_ZERO_POINT`] for standard magnitudes.
    pub fn f555w() -> Self {
        Self::new(lit(0.), lit(0.241), lit(0.103))
    }

    /// F814W as used in the reference reduction. See [`f555w`](Self::f555w()) for the zero point.
    pub fn f814w() -> Self {
        Self::new(lit(0.), lit(0.425), lit(0.056))
    }

    /// Set the zero point.
    pub fn with_zero_point(mut self, zero_point: F) -> Self {
        self.zero_point = zero_point;
        self
    }

    /// Set the aperture correction.
    pub fn with_aperture_correction(mut self, aperture_correction: F) -> Self {
        self.aperture_correction = aperture_correction;
        self
    }

    /// Set the extinction.
    pub fn with_extinction(mut self, extinction: F) -> Self {
        self.extinction = extinction;
        self
    }

    /// Calibrate a single magnitude.
    pub fn apply_one(&self, magnitude: F) -> F {
        magnitude + self.zero_point - self.aperture_correction - self.extinction
    }

    /// Calibrate magnitudes elementwise.
    pub fn apply<M>(&self, magnitudes: M) -> Array1<F>
    where
        M: IntoNdarray1<Out = Array1<F>>,
    {
        magnitudes
            .into_ndarray1()
            .mapv_into(|magnitude| self.apply_one(magnitude))
    }
}

/// Calibrate magnitudes elementwise: `m + zero_point - aperture_correction - extinction`.
///
/// # Example:
/// ```
/// # use approx::assert_abs_diff_eq;
/// # use xmatch::calibrate;
/// let calibrated = calibrate(vec![10., 11.], 0., 0.241, 0.103);
/// assert_abs_diff_eq!(calibrated[0], 9.656, epsilon = 1e-12);
/// assert_abs_diff_eq!(calibrated[1], 10.656, epsilon = 1e-12);
/// ```
pub fn calibrate<F, M>(magnitudes: M, zero_point: F, aperture_correction: F, extinction: F) -> Array1<F>
where
    F: Float,
    M: IntoNdarray1<Out = Array1<F>>,
{
    BandCalibration::new(zero_point, aperture_correction, extinction).apply(magnitudes)
}
