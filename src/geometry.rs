//! Positions on the celestial sphere and the great-circle distance between them.

use nalgebra::Vector3;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::{Float, lit};

/// Arcseconds in one degree.
const ARCSEC_PER_DEGREE: f64 = 3600.;

/// Equatorial sky position.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct SkyPosition<F: Float> {
    /// Right ascension in degrees.
    pub ra: F,
    /// Declination in degrees.
    pub dec: F,
}

impl<F: Float> SkyPosition<F> {
    /// Create a position from right ascension and declination in degrees.
    pub fn new(ra: F, dec: F) -> Self {
        Self { ra, dec }
    }

    /// Great-circle separation to `other` in arcseconds.
    pub fn separation(&self, other: &Self) -> F {
        let (sin_dec1, cos_dec1) = to_radians(self.dec).sin_cos();
        let (sin_dec2, cos_dec2) = to_radians(other.dec).sin_cos();
        let delta_ra = to_radians(other.ra - self.ra);

        let separation = vincenty(sin_dec1, cos_dec1, sin_dec2, cos_dec2, delta_ra);
        to_arcsec(separation)
    }

    /// Cartesian unit vector pointing at this position.
    pub fn unit_vector(&self) -> Vector3<F> {
        let (sin_ra, cos_ra) = to_radians(self.ra).sin_cos();
        let (sin_dec, cos_dec) = to_radians(self.dec).sin_cos();
        Vector3::new(cos_dec * cos_ra, cos_dec * sin_ra, sin_dec)
    }
}

/// Unit vector as a plain array, the point type of the kd-tree.
pub(crate) fn unit_array<F: Float>(position: &SkyPosition<F>) -> [F; 3] {
    position.unit_vector().into()
}

fn to_radians<F: Float>(degrees: F) -> F {
    degrees * F::pi() / lit(180.)
}

fn to_arcsec<F: Float>(radians: F) -> F {
    radians * lit::<F>(180. * ARCSEC_PER_DEGREE) / F::pi()
}

/// Vincenty formula for the angle between two points on the sphere, in radians.
///
/// Accurate at all separations, including sub-arcsecond ones.
fn vincenty<F: Float>(sin_lat1: F, cos_lat1: F, sin_lat2: F, cos_lat2: F, delta_lon: F) -> F {
    let (sin_delta_lon, cos_delta_lon) = delta_lon.sin_cos();

    let num = ((cos_lat2 * sin_delta_lon).powi(2)
        + (cos_lat1 * sin_lat2 - sin_lat1 * cos_lat2 * cos_delta_lon).powi(2))
    .sqrt();
    let den = sin_lat1 * sin_lat2 + cos_lat1 * cos_lat2 * cos_delta_lon;

    num.atan2(den)
}
