//! Flux density to AB and Vega magnitudes.
//!
//! ```text
//! m_AB   = -2.5 · log10(F_ν / 3631 Jy)
//! m_Vega = m_AB - (AB - Vega offset)
//! ```

use serde::{Deserialize, Serialize};

use crate::calibration::AbVegaTable;
use crate::error::PhotometryError;

/// AB magnitude system zero-point flux density in Jansky
pub const AB_ZERO_POINT_JY: f64 = 3631.0;

/// AB magnitude of a flux density in Jansky.
///
/// # Errors
///
/// [`PhotometryError::NonPositiveFlux`] for zero, negative or non-finite flux.
pub fn ab_magnitude(flux_jy: f64) -> Result<f64, PhotometryError> {
    if !flux_jy.is_finite() || flux_jy <= 0.0 {
        return Err(PhotometryError::NonPositiveFlux { flux: flux_jy });
    }
    Ok(-2.5 * (flux_jy / AB_ZERO_POINT_JY).log10())
}

/// Flux density in Jansky for an AB magnitude.
pub fn flux_from_ab_magnitude(ab_mag: f64) -> f64 {
    AB_ZERO_POINT_JY * 10f64.powf(-0.4 * ab_mag)
}

/// Vega magnitude from an AB magnitude and the filter's `AB - Vega` offset.
pub fn vega_magnitude(ab_mag: f64, ab_vega_offset: f64) -> f64 {
    ab_mag - ab_vega_offset
}

/// Both magnitudes for one flux measurement.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Magnitudes {
    pub ab: f64,
    pub vega: f64,
}

/// Converts flux densities using a shared offset table.
#[derive(Debug, Clone, Copy)]
pub struct MagnitudeConverter<'a> {
    offsets: &'a AbVegaTable,
}

impl<'a> MagnitudeConverter<'a> {
    pub fn new(offsets: &'a AbVegaTable) -> Self {
        Self { offsets }
    }

    /// AB and Vega magnitudes of `flux_jy` through `filter`/`pupil`.
    ///
    /// # Errors
    ///
    /// [`PhotometryError::NonPositiveFlux`] if the flux is not strictly positive;
    /// [`PhotometryError::AmbiguousCalibrationLookup`] if the offset table does
    /// not hold exactly one row for the filter and pupil.
    pub fn convert(
        &self,
        flux_jy: f64,
        filter: &str,
        pupil: &str,
    ) -> Result<Magnitudes, PhotometryError> {
        let ab = ab_magnitude(flux_jy)?;
        let offset = self.offsets.offset(filter, pupil)?;
        Ok(Magnitudes {
            ab,
            vega: vega_magnitude(ab, offset),
        })
    }
}
