//! Calibration reference tables keyed by `(filter, pupil)`.
//!
//! Two tables are used:
//!
//! - aperture rows: encircled energy, photometric radius, aperture correction
//!   and sky annulus radii for each filter
//! - AB-to-Vega offset rows
//!
//! Both are indexed once into a map on construction. A lookup must match
//! exactly one row; zero or several matches are reported as
//! [`PhotometryError::AmbiguousCalibrationLookup`]. Filter and pupil names are
//! compared after upper-casing, with no other fuzzy matching.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::error::PhotometryError;
use crate::image_proc::ApertureGeometry;

/// Pupil used by direct imaging.
pub const DEFAULT_PUPIL: &str = "CLEAR";

/// One row of the aperture-correction reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApertureCorrectionRow {
    #[serde(alias = "filt")]
    pub filter: String,
    pub pupil: String,
    /// Fraction of the PSF energy inside `r_phot`
    #[serde(alias = "ee")]
    pub encircled_energy_fraction: f64,
    /// Aperture radius in pixels
    #[serde(alias = "r_phot")]
    pub photometric_radius: f64,
    /// Multiplier restoring the flux outside `r_phot`
    #[serde(alias = "apcorr")]
    pub aperture_correction_factor: f64,
    #[serde(alias = "skyin")]
    pub sky_inner_radius: f64,
    #[serde(alias = "skyout")]
    pub sky_outer_radius: f64,
}

/// One row of the AB-to-Vega offset reference table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AbVegaOffsetRow {
    pub filter: String,
    pub pupil: String,
    /// `AB - Vega` in magnitudes
    #[serde(alias = "abvega_offset")]
    pub ab_vega_offset: f64,
}

/// Everything the pipeline needs to know about one filter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CalibrationParams {
    pub filter_name: String,
    pub pupil: String,
    pub encircled_energy_fraction: f64,
    pub photometric_radius: f64,
    pub aperture_correction_factor: f64,
    pub sky_inner_radius: f64,
    pub sky_outer_radius: f64,
    pub ab_vega_offset: f64,
}

impl CalibrationParams {
    /// Aperture geometry from the tabulated radii.
    pub fn geometry(&self) -> Result<ApertureGeometry, PhotometryError> {
        ApertureGeometry::new(
            self.photometric_radius,
            self.sky_inner_radius,
            self.sky_outer_radius,
        )
    }
}

fn table_key(filter: &str, pupil: &str) -> (String, String) {
    (filter.trim().to_uppercase(), pupil.trim().to_uppercase())
}

/// Rows grouped by normalized `(filter, pupil)`.
///
/// Duplicate keys are kept so that lookups can report them.
#[derive(Debug, Clone)]
struct KeyedRows<R> {
    rows: HashMap<(String, String), Vec<R>>,
}

impl<R> KeyedRows<R> {
    fn build(rows: impl IntoIterator<Item = R>, key: impl Fn(&R) -> (String, String)) -> Self {
        let mut grouped: HashMap<(String, String), Vec<R>> = HashMap::new();
        for row in rows {
            grouped.entry(key(&row)).or_default().push(row);
        }
        Self { rows: grouped }
    }

    fn lookup(&self, filter: &str, pupil: &str) -> Result<&R, PhotometryError> {
        let key = table_key(filter, pupil);
        match self.rows.get(&key).map(Vec::as_slice) {
            Some([row]) => Ok(row),
            other => Err(PhotometryError::AmbiguousCalibrationLookup {
                filter: key.0,
                pupil: key.1,
                matches: other.map_or(0, <[R]>::len),
            }),
        }
    }

    fn len(&self) -> usize {
        self.rows.values().map(Vec::len).sum()
    }
}

/// AB-to-Vega offsets keyed by `(filter, pupil)`.
#[derive(Debug, Clone)]
pub struct AbVegaTable {
    rows: KeyedRows<AbVegaOffsetRow>,
}

impl AbVegaTable {
    pub fn new(rows: impl IntoIterator<Item = AbVegaOffsetRow>) -> Self {
        Self {
            rows: KeyedRows::build(rows, |r| table_key(&r.filter, &r.pupil)),
        }
    }

    /// `AB - Vega` offset for a filter and pupil.
    pub fn offset(&self, filter: &str, pupil: &str) -> Result<f64, PhotometryError> {
        self.rows.lookup(filter, pupil).map(|r| r.ab_vega_offset)
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Both reference tables, merged into [`CalibrationParams`] on lookup.
#[derive(Debug, Clone)]
pub struct CalibrationTable {
    apertures: KeyedRows<ApertureCorrectionRow>,
    offsets: AbVegaTable,
}

impl CalibrationTable {
    pub fn new(
        apertures: impl IntoIterator<Item = ApertureCorrectionRow>,
        offsets: AbVegaTable,
    ) -> Self {
        Self {
            apertures: KeyedRows::build(apertures, |r| table_key(&r.filter, &r.pupil)),
            offsets,
        }
    }

    /// Calibration for one filter/pupil.
    ///
    /// # Errors
    ///
    /// [`PhotometryError::AmbiguousCalibrationLookup`] if either table does not
    /// hold exactly one row for the key.
    pub fn params(&self, filter: &str, pupil: &str) -> Result<CalibrationParams, PhotometryError> {
        let row = self.apertures.lookup(filter, pupil)?;
        let ab_vega_offset = self.offsets.offset(filter, pupil)?;

        Ok(CalibrationParams {
            filter_name: row.filter.to_uppercase(),
            pupil: row.pupil.to_uppercase(),
            encircled_energy_fraction: row.encircled_energy_fraction,
            photometric_radius: row.photometric_radius,
            aperture_correction_factor: row.aperture_correction_factor,
            sky_inner_radius: row.sky_inner_radius,
            sky_outer_radius: row.sky_outer_radius,
            ab_vega_offset,
        })
    }

    pub fn offsets(&self) -> &AbVegaTable {
        &self.offsets
    }
}

/// NIRCam CLEAR-pupil aperture rows at 70% encircled energy.
pub fn nircam_aperture_defaults() -> Vec<ApertureCorrectionRow> {
    let row = |filter: &str, r_phot: f64, apcorr: f64, skyin: f64, skyout: f64| {
        ApertureCorrectionRow {
            filter: filter.to_string(),
            pupil: DEFAULT_PUPIL.to_string(),
            encircled_energy_fraction: 0.7,
            photometric_radius: r_phot,
            aperture_correction_factor: apcorr,
            sky_inner_radius: skyin,
            sky_outer_radius: skyout,
        }
    };

    vec![
        row("F150W", 3.199, 1.4485, 6.082, 9.496),
        row("F480M", 3.757, 1.4863, 4.92, 7.083),
    ]
}
