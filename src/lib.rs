#![warn(missing_docs)]

//! Cross-matching of two photometric source catalogs into a calibrated color-magnitude dataset,
//! plus the closed-form derivation of exoplanet transit parameters
//! ([Seager & Mallén-Ornelas 2003](<https://iopscience.iop.org/article/10.1086/346105>)).
//!
//! ## Cross-matching
//! The central struct is [`CrossMatch`]. It takes two [`Catalog`]s (e.g. the same field observed
//! through two filters), drops undetected sources, pairs every source of the first catalog with its
//! nearest neighbour in the second, resolves contested neighbours into a one-to-one [`MatchSet`] and
//! calibrates the matched magnitudes. \
//! In most cases, it should be created with [`CrossMatch::kdtree()`];
//! [`CrossMatch::brute_force()`] checks every pair and is meant for small catalogs and verification.
//! Additional parameters are set via `CrossMatch::with_*()` functions.
//!
//! Example:
//! ```rust
//! use xmatch::{BandCalibration, Catalog, CrossMatch, SourceRecord};
//!
//! let f555: Catalog<f64> = vec![SourceRecord::new(0., 0., 10.)].into_iter().collect();
//! let f814: Catalog<f64> = vec![SourceRecord::new(0., 0.00001, 12.)].into_iter().collect();
//!
//! let cmd = CrossMatch::kdtree(f555, f814)
//!     .with_threshold(0.1)
//!     .with_calibration(BandCalibration::f555w(), BandCalibration::f814w())
//!     .run()
//!     .unwrap();
//! assert_eq!(cmd.len(), 1);
//! ```
//!
//! ## Parameters
//! - `threshold`: Maximum separation of a match in arcseconds, exclusive. Defaults to `0.1`.
//! - `policy`: Which claimant keeps a contested neighbour, see [`ClaimPolicy`].
//!     Defaults to [`ClaimPolicy::FirstClaim`], the behaviour of the reference reduction.
//! - `sentinel`: Magnitude flagging an undetected source. Defaults to `99.0`.
//! - `calibration`: Zero point, aperture correction and extinction of each band, see [`BandCalibration`].
//!
//! ## Transit parameters
//! [`TransitModel::derive()`] turns period, depth and the two transit durations into
//! planet radius, stellar density, scaled semi-major axis, impact parameter and inclination.

pub mod catalog;
pub mod error;
pub mod geometry;
pub mod matching;
pub(crate) mod ndarray_utils;
pub mod photometry;
pub(crate) mod pipeline;
pub mod transit;

pub use catalog::{Catalog, DEFAULT_SENTINEL, SourceRecord};
pub use error::{Error, Result};
pub use geometry::SkyPosition;
pub use matching::{
    BruteForceMatcher, CandidatePair, ClaimPolicy, KdTreeMatcher, MatchSet, SkyMatcher, resolve,
};
pub use ndarray_utils::IntoNdarray1;
pub use photometry::{BandCalibration, calibrate};
pub use pipeline::{ColorMagnitude, CrossMatch};
pub use transit::{TransitModel, TransitObservables, TransitParameters};

/// A generic float trait such that all computations are generic over `f32`/`f64`.
///
/// This trait is automatically implemented for all types implementing the supertraits.
/// Particularly, this includes `f32` and `f64`.
/// [`num_traits::Float`] is not a supertrait as the need to specify the provider of the redundant definitions of the basic math functions would clutter the code.
pub trait Float: Copy + Default + nalgebra::RealField + num_traits::FromPrimitive {}

impl<F> Float for F where F: Copy + Default + nalgebra::RealField + num_traits::FromPrimitive {}

/// Lift an `f64` constant into `F`.
#[inline]
pub(crate) fn lit<F: Float>(value: f64) -> F {
    nalgebra::convert(value)
}
