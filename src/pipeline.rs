//! Main interface: from two raw catalogs to calibrated, matched magnitudes.

use log::{debug, info, warn};
use ndarray::{Array1, Axis};

use crate::catalog::{Catalog, DEFAULT_SENTINEL};
use crate::error::{Error, Result};
use crate::matching::{
    BruteForceMatcher, ClaimPolicy, KdTreeMatcher, MatchSet, SkyMatcher, resolve,
};
use crate::photometry::BandCalibration;
use crate::{Float, lit};

/// Default maximum separation of a match, in arcseconds.
const DEFAULT_THRESHOLD: f64 = 0.1;

/// Matched and calibrated magnitudes of two bands.
///
/// Entry `i` of both magnitude arrays belongs to `matches[i]`. Indices in `matches` refer to the catalogs
/// after undetected sources were removed.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ColorMagnitude<F: Float> {
    /// The resolved matches.
    pub matches: MatchSet<F>,
    /// Calibrated magnitudes from catalog A.
    pub magnitudes_a: Array1<F>,
    /// Calibrated magnitudes from catalog B.
    pub magnitudes_b: Array1<F>,
}

impl<F: Float> ColorMagnitude<F> {
    /// Number of matched sources.
    pub fn len(&self) -> usize {
        self.matches.len()
    }

    /// Whether nothing matched.
    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    /// Color index `A - B` of every match.
    pub fn color(&self) -> Array1<F> {
        &self.magnitudes_a - &self.magnitudes_b
    }

    /// Calibrated magnitude pairs `(A, B)`.
    pub fn pairs(&self) -> impl Iterator<Item = (F, F)> + '_ {
        self.magnitudes_a
            .iter()
            .copied()
            .zip(self.magnitudes_b.iter().copied())
    }
}

/// The central struct of this library.
///
/// Use this in order to build options for cross-matching.
/// For more details, check the module-level documentation.
#[derive(Clone, Debug)]
pub struct CrossMatch<F: Float, M: SkyMatcher<F>> {
    /// Catalog of the first band.
    catalog_a: Catalog<F>,
    /// Catalog of the second band.
    catalog_b: Catalog<F>,
    /// Choice of nearest-neighbour search.
    matcher: M,
    /// Maximum separation in arcseconds, exclusive.
    threshold: F,
    /// Resolution of contested neighbours.
    policy: ClaimPolicy,
    /// Magnitude of undetected sources.
    sentinel: F,
    /// Corrections of the first band.
    calibration_a: BandCalibration<F>,
    /// Corrections of the second band.
    calibration_b: BandCalibration<F>,
}

impl<F: Float + num_traits::float::FloatCore> CrossMatch<F, KdTreeMatcher> {
    /// Search nearest neighbours with a kd-tree.
    /// Use `with_` functions to set parameters.
    pub fn kdtree(catalog_a: Catalog<F>, catalog_b: Catalog<F>) -> Self {
        Self::new(catalog_a, catalog_b)
    }
}

impl<F: Float> CrossMatch<F, BruteForceMatcher> {
    /// Search nearest neighbours by computing every separation.
    /// Use `with_` functions to set parameters.
    pub fn brute_force(catalog_a: Catalog<F>, catalog_b: Catalog<F>) -> Self {
        Self::new(catalog_a, catalog_b)
    }
}

impl<F, M> CrossMatch<F, M>
where
    F: Float,
    M: SkyMatcher<F>,
{
    /// Create a new instance using default options.
    /// This allows for creating an instance using a generic [`SkyMatcher`].
    /// Otherwise, use [`kdtree`](CrossMatch::kdtree()) or [`brute_force`](CrossMatch::brute_force()).
    pub fn new(catalog_a: Catalog<F>, catalog_b: Catalog<F>) -> Self {
        Self {
            catalog_a,
            catalog_b,
            matcher: M::default(),
            threshold: lit(DEFAULT_THRESHOLD),
            policy: ClaimPolicy::default(),
            sentinel: lit(DEFAULT_SENTINEL),
            calibration_a: BandCalibration::default(),
            calibration_b: BandCalibration::default(),
        }
    }

    /// Set the maximum separation of a match in arcseconds.
    pub fn with_threshold(mut self, threshold: F) -> Self {
        self.threshold = threshold;
        self
    }

    /// Set how contested neighbours are resolved.
    pub fn with_policy(mut self, policy: ClaimPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Set the magnitude that flags undetected sources.
    pub fn with_sentinel(mut self, sentinel: F) -> Self {
        self.sentinel = sentinel;
        self
    }

    /// Set the calibration of both bands.
    pub fn with_calibration(
        mut self,
        calibration_a: BandCalibration<F>,
        calibration_b: BandCalibration<F>,
    ) -> Self {
        self.calibration_a = calibration_a;
        self.calibration_b = calibration_b;
        self
    }

    /// Filter, match, resolve and calibrate.
    ///
    /// # Errors
    /// [`Error::Configuration`] if the threshold is not a positive, finite number.
    ///
    /// An empty catalog, before or after filtering, is not an error and gives an empty result.
    pub fn run(self) -> Result<ColorMagnitude<F>> {
        if !(self.threshold.is_finite() && self.threshold > lit(0.)) {
            return Err(Error::configuration(format!(
                "match threshold must be positive and finite, got {}",
                self.threshold
            )));
        }

        let catalog_a = self.catalog_a.filter_detected(self.sentinel);
        let catalog_b = self.catalog_b.filter_detected(self.sentinel);
        info!(
            "Kept {} of {} sources in catalog A and {} of {} in catalog B.",
            catalog_a.len(),
            self.catalog_a.len(),
            catalog_b.len(),
            self.catalog_b.len()
        );

        if catalog_a.is_empty() || catalog_b.is_empty() {
            warn!("No detected sources left in one of the catalogs, nothing to match.");
            return Ok(ColorMagnitude::default());
        }

        info!("Computing nearest neighbours.");
        let candidates = self
            .matcher
            .nearest(&catalog_a.positions(), &catalog_b.positions());

        info!("Resolving {} candidates.", candidates.len());
        let matches = resolve(&candidates, self.threshold, self.policy);
        debug!("Discarded {} candidates.", candidates.len() - matches.len());

        info!("Calibrating {} matches.", matches.len());
        let (indices_a, indices_b) = matches.indices();
        let magnitudes_a = self
            .calibration_a
            .apply(catalog_a.magnitudes().select(Axis(0), &indices_a));
        let magnitudes_b = self
            .calibration_b
            .apply(catalog_b.magnitudes().select(Axis(0), &indices_b));

        Ok(ColorMagnitude {
            matches,
            magnitudes_a,
            magnitudes_b,
        })
    }
}
