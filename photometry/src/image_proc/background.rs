//! Sky background estimation from the annulus pixels.
//!
//! The per-pixel sky level is the median of the annulus values, which keeps a
//! minority of contaminated pixels (cosmic rays, neighbouring sources) from
//! biasing the estimate. The total sky under the aperture is that median times
//! the number of source pixels. The annulus mean is kept beside it; a mean
//! well above the median points at a contaminated annulus.

use meter_math::stats::{mean, median};
use serde::{Deserialize, Serialize};

use super::aperture_photometry::ApertureSet;
use crate::error::PhotometryError;

/// Annuli with fewer pixels than this get a warning.
pub const SPARSE_ANNULUS_PIXELS: usize = 10;

/// Sky level under a source aperture.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BackgroundEstimate {
    /// Median of the annulus pixel values
    pub median: f64,
    /// Mean of the annulus pixel values, for diagnostics only
    pub mean: f64,
    /// `median * n_source_pixels`
    pub total: f64,
    /// Number of annulus pixels that went into the median
    pub n_background_pixels: usize,
    /// Number of source pixels the total was scaled to
    pub n_source_pixels: usize,
}

impl BackgroundEstimate {
    fn from_median(median: f64, mean: f64, set: &ApertureSet) -> Self {
        let n_source_pixels = set.source.len();
        Self {
            median,
            mean,
            total: median * n_source_pixels as f64,
            n_background_pixels: set.background.len(),
            n_source_pixels,
        }
    }
}

fn empty_sample(set: &ApertureSet) -> PhotometryError {
    PhotometryError::EmptyBackgroundSample {
        x: set.center.x,
        y: set.center.y,
        r_in: set.geometry.r_in,
        r_out: set.geometry.r_out,
    }
}

fn warn_if_sparse(set: &ApertureSet) {
    if set.background.len() < SPARSE_ANNULUS_PIXELS {
        log::warn!(
            "only {} background pixels in annulus {:.2}..{:.2} around ({:.2}, {:.2})",
            set.background.len(),
            set.geometry.r_in,
            set.geometry.r_out,
            set.center.x,
            set.center.y
        );
    }
}

/// Median sky level and total sky contribution for the set's source pixels.
///
/// # Errors
///
/// [`PhotometryError::EmptyBackgroundSample`] if the annulus holds no pixels.
/// A zero background is never substituted.
pub fn estimate_background(set: &ApertureSet) -> Result<BackgroundEstimate, PhotometryError> {
    warn_if_sparse(set);

    let fluxes = set.background_fluxes();
    let median_value = median(&fluxes).map_err(|_| empty_sample(set))?;
    let mean_value = mean(&fluxes).map_err(|_| empty_sample(set))?;

    Ok(BackgroundEstimate::from_median(median_value, mean_value, set))
}

/// Median by partial selection instead of a full sort.
///
/// Returns `None` for an empty or all-NaN slice.
pub fn median_by_selection(values: &[f64]) -> Option<f64> {
    let mut valid: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    let n = valid.len();
    if n == 0 {
        return None;
    }

    let mid = n / 2;
    let (lower, &mut upper_mid, _) = valid.select_nth_unstable_by(mid, f64::total_cmp);
    if n % 2 == 1 {
        return Some(upper_mid);
    }

    // Everything left of `mid` is <= upper_mid; its max is the other middle value
    let lower_mid = lower.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    Some((lower_mid + upper_mid) / 2.0)
}

/// Same contract as [`estimate_background`], computed with [`median_by_selection`].
pub fn estimate_background_by_selection(
    set: &ApertureSet,
) -> Result<BackgroundEstimate, PhotometryError> {
    warn_if_sparse(set);

    let fluxes = set.background_fluxes();
    let median_value = median_by_selection(&fluxes).ok_or_else(|| empty_sample(set))?;
    let mean_value = mean(&fluxes).map_err(|_| empty_sample(set))?;

    Ok(BackgroundEstimate::from_median(median_value, mean_value, set))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::image::Position;
    use crate::image_proc::aperture_photometry::{ApertureGeometry, AperturePixel};
    use approx::assert_relative_eq;

    fn set_with(source: usize, background: &[f64]) -> ApertureSet {
        let pixel = |i: usize, flux: f64| AperturePixel { x: i, y: 0, flux };
        ApertureSet {
            center: Position::new(5.0, 5.0),
            geometry: ApertureGeometry::new(2.0, 4.0, 6.0).unwrap(),
            source: (0..source).map(|i| pixel(i, 10.0)).collect(),
            background: background
                .iter()
                .enumerate()
                .map(|(i, &f)| pixel(i, f))
                .collect(),
        }
    }

    #[test]
    fn test_background_median_and_total() {
        let set = set_with(13, &[2.0, 1.0, 3.0, 1.5, 2.5]);

        let estimate = estimate_background(&set).unwrap();

        assert_relative_eq!(estimate.median, 2.0);
        assert_relative_eq!(estimate.total, 26.0);
        assert_eq!(estimate.n_background_pixels, 5);
        assert_eq!(estimate.n_source_pixels, 13);
    }

    #[test]
    fn test_background_outlier_does_not_move_median() {
        let clean = set_with(5, &[1.0, 1.2, 0.9, 1.1, 1.0, 0.95, 1.05]);
        let mut values = clean.background_fluxes();
        values[3] = 1.0e9;
        let dirty = set_with(5, &values);

        let clean = estimate_background(&clean).unwrap();
        let dirty = estimate_background(&dirty).unwrap();

        assert_relative_eq!(clean.median, dirty.median);
        assert_relative_eq!(clean.mean, 7.2 / 7.0, epsilon = 1e-12);
        assert!(dirty.mean > 1.0e8);
    }

    #[test]
    fn test_background_empty_annulus_fails() {
        let set = set_with(9, &[]);

        let err = estimate_background(&set).unwrap_err();

        assert_eq!(
            err,
            PhotometryError::EmptyBackgroundSample {
                x: 5.0,
                y: 5.0,
                r_in: 4.0,
                r_out: 6.0
            }
        );
        assert_eq!(estimate_background_by_selection(&set).unwrap_err(), err);
    }

    #[test]
    fn test_median_by_selection_matches_sorted_median() {
        let samples: [&[f64]; 5] = [
            &[4.0],
            &[4.0, 1.0],
            &[5.0, 3.0, 9.0, 1.0, 7.0],
            &[2.0, 8.0, 6.0, 4.0, 10.0, 12.0],
            &[1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 3.0, 3.0],
        ];
        for values in samples {
            assert_relative_eq!(
                median_by_selection(values).unwrap(),
                median(values).unwrap()
            );
        }
    }

    #[test]
    fn test_median_by_selection_empty() {
        assert_eq!(median_by_selection(&[]), None);
        assert_eq!(median_by_selection(&[f64::NAN]), None);
    }

    #[test]
    fn test_negative_background_is_kept() {
        let set = set_with(4, &[-0.5, -0.25, -1.0]);

        let estimate = estimate_background(&set).unwrap();

        assert_relative_eq!(estimate.median, -0.5);
        assert_relative_eq!(estimate.total, -2.0);
    }
}
