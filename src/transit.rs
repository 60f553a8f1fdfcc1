//! Physical parameters of a transiting planet from the shape of its light curve.
//!
//! The equations are the closed-form solutions of
//! [Seager & Mallén-Ornelas 2003](<https://iopscience.iop.org/article/10.1086/346105>)
//! in the limit of a semi-major axis much larger than the stellar radius.
//! Period and durations may use any time unit as long as it is the same for all three;
//! the stellar density scales with the chosen density constant.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::{Float, lit};

/// Default prefactor of the stellar density equation.
pub const DENSITY_CONSTANT: f64 = 3.46e-3;

/// What can be read off a transit light curve.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransitObservables<F: Float> {
    /// Orbital period.
    pub period: F,
    /// Fractional drop in flux, `(R_p / R_*)^2`.
    pub depth: F,
    /// Duration between first and fourth contact.
    pub total_duration: F,
    /// Duration between second and third contact, i.e. while the planet is fully in front of the star.
    pub full_duration: F,
}

impl<F: Float> TransitObservables<F> {
    /// Create new observables.
    pub fn new(period: F, depth: F, total_duration: F, full_duration: F) -> Self {
        Self {
            period,
            depth,
            total_duration,
            full_duration,
        }
    }
}

/// Derived system parameters.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransitParameters<F: Float> {
    /// Planet radius in stellar radii.
    pub planet_radius: F,
    /// Mean stellar density.
    pub stellar_density: F,
    /// Semi-major axis in stellar radii.
    pub scaled_semi_major_axis: F,
    /// Impact parameter in stellar radii.
    pub impact_parameter: F,
    /// Orbital inclination in radians.
    pub inclination: F,
}

impl<F: Float> TransitParameters<F> {
    /// Orbital inclination in degrees.
    pub fn inclination_degrees(&self) -> F {
        self.inclination * lit(180.) / F::pi()
    }
}

/// Closed-form transit solution.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TransitModel<F: Float> {
    /// Prefactor of the stellar density, `C` in `C * P * depth^(3/4) / (T^2 - F^2)^(3/2)`.
    density_constant: F,
}

impl<F: Float> Default for TransitModel<F> {
    fn default() -> Self {
        Self {
            density_constant: lit(DENSITY_CONSTANT),
        }
    }
}

impl<F: Float> TransitModel<F> {
    /// Set the prefactor of the stellar density equation.
    pub fn with_density_constant(mut self, density_constant: F) -> Self {
        self.density_constant = density_constant;
        self
    }

    /// Derive all parameters.
    ///
    /// # Errors
    /// - [`Error::Configuration`] if an input is not finite, the period is not positive
    ///   or a duration is negative.
    /// - [`Error::Domain`] if the depth is negative, the total duration does not exceed the full duration,
    ///   or the observables are inconsistent such that the impact parameter or the inclination
    ///   have no real solution. Nothing is clamped.
    pub fn derive(&self, observables: &TransitObservables<F>) -> Result<TransitParameters<F>> {
        let TransitObservables {
            period,
            depth,
            total_duration,
            full_duration,
        } = *observables;
        let zero = lit::<F>(0.);
        let one = lit::<F>(1.);

        for (name, value) in [
            ("period", period),
            ("depth", depth),
            ("total duration", total_duration),
            ("full duration", full_duration),
        ] {
            if !value.is_finite() {
                return Err(Error::configuration(format!("{name} is {value}")));
            }
        }
        if period <= zero {
            return Err(Error::configuration(format!(
                "period must be positive, got {period}"
            )));
        }
        if total_duration < zero || full_duration < zero {
            return Err(Error::configuration(format!(
                "durations must not be negative, got {total_duration} and {full_duration}"
            )));
        }
        if depth < zero {
            return Err(Error::domain(format!("square root of negative depth {depth}")));
        }
        if total_duration <= full_duration {
            return Err(Error::domain(format!(
                "total duration {total_duration} does not exceed full duration {full_duration}"
            )));
        }

        let sqrt_depth = depth.sqrt();
        let chord = total_duration.powi(2) - full_duration.powi(2);

        let stellar_density =
            self.density_constant * period * sqrt_depth.sqrt().powi(3) / chord.powi(3).sqrt();
        let scaled_semi_major_axis =
            lit::<F>(2.) * period * sqrt_depth.sqrt() / (F::pi() * chord.sqrt());

        // 1 - ratio > 0 as the total duration exceeds the full one
        let ratio = (full_duration / total_duration).powi(2);
        let radicand =
            ((one - sqrt_depth).powi(2) - ratio * (one + sqrt_depth).powi(2)) / (one - ratio);
        if radicand < zero {
            return Err(Error::domain(format!(
                "impact parameter squared is negative ({radicand})"
            )));
        }
        let impact_parameter = radicand.sqrt();

        let cos_inclination = impact_parameter / scaled_semi_major_axis;
        if !(cos_inclination >= -one && cos_inclination <= one) {
            return Err(Error::domain(format!(
                "arccos of {cos_inclination}: impact parameter {impact_parameter} exceeds semi-major axis {scaled_semi_major_axis}"
            )));
        }

        Ok(TransitParameters {
            planet_radius: sqrt_depth,
            stellar_density,
            scaled_semi_major_axis,
            impact_parameter,
            inclination: cos_inclination.acos(),
        })
    }
}
