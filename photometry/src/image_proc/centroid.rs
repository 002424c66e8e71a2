//! Flux-weighted centroid calculation
//!
//! Both entry points compute the first raw image moments
//!
//! ```text
//! m00 = Σ f,  m10 = Σ x·f,  m01 = Σ y·f
//! x_c = m10 / m00,  y_c = m01 / m00
//! ```
//!
//! over the valid (non-NaN) pixels, with `x` the column and `y` the row of
//! each pixel. A region without positive total weight has no meaningful
//! centroid and is reported as [`PhotometryError::DegenerateCentroid`] rather
//! than collapsing to a default position.

use ndarray::ArrayView2;

use crate::error::PhotometryError;
use crate::image::Position;

#[derive(Debug, Default, Clone, Copy)]
struct RawMoments {
    m00: f64,
    m10: f64,
    m01: f64,
    n_valid: usize,
}

impl RawMoments {
    fn accumulate(&mut self, x: usize, y: usize, intensity: f64) {
        self.m00 += intensity;
        self.m10 += x as f64 * intensity;
        self.m01 += y as f64 * intensity;
        self.n_valid += 1;
    }

    fn centroid(self) -> Result<Position, PhotometryError> {
        // Total weight must be strictly positive
        if !self.m00.is_finite() || self.m00 <= 0.0 {
            return Err(PhotometryError::DegenerateCentroid {
                valid_pixels: self.n_valid,
                total_weight: self.m00,
            });
        }

        Ok(Position::new(self.m10 / self.m00, self.m01 / self.m00))
    }
}

/// Flux-weighted centroid of every valid pixel in `image`.
///
/// # Arguments
///
/// * `image` - Region to centroid, indexed `[[y, x]]`; NaN pixels are skipped
///
/// # Returns
///
/// Sub-pixel position relative to the region origin.
///
/// # Errors
///
/// [`PhotometryError::DegenerateCentroid`] if there are no valid pixels or the
/// valid pixels sum to a non-positive weight.
pub fn flux_weighted_centroid(image: &ArrayView2<f64>) -> Result<Position, PhotometryError> {
    let mut moments = RawMoments::default();

    for ((row, col), &intensity) in image.indexed_iter() {
        if intensity.is_nan() {
            continue;
        }
        moments.accumulate(col, row, intensity);
    }

    moments.centroid()
}

/// Flux-weighted centroid restricted to the pixels where `mask` is true.
///
/// Masked-in pixels that are NaN are still skipped.
///
/// # Panics
///
/// Panics if `image` and `mask` differ in shape.
pub fn centroid_from_mask(
    image: &ArrayView2<f64>,
    mask: &ArrayView2<bool>,
) -> Result<Position, PhotometryError> {
    assert_eq!(
        image.shape(),
        mask.shape(),
        "Image and mask must have same dimensions"
    );

    let mut moments = RawMoments::default();

    for ((row, col), &mask_val) in mask.indexed_iter() {
        let intensity = image[[row, col]];
        if mask_val && !intensity.is_nan() {
            moments.accumulate(col, row, intensity);
        }
    }

    moments.centroid()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::Array2;

    #[test]
    fn test_centroid_uniform_is_geometric_center() {
        for &(width, height) in &[(1, 1), (4, 7), (21, 21), (10, 3)] {
            let image = Array2::from_elem((height, width), 3.5);
            let result = flux_weighted_centroid(&image.view()).unwrap();

            assert_relative_eq!(result.x, (width as f64 - 1.0) / 2.0, epsilon = 1e-12);
            assert_relative_eq!(result.y, (height as f64 - 1.0) / 2.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_centroid_single_pixel() {
        let mut image = Array2::from_elem((5, 6), 0.0);
        image[[3, 1]] = 100.0;

        let result = flux_weighted_centroid(&image.view()).unwrap();

        assert_relative_eq!(result.x, 1.0, epsilon = 1e-12);
        assert_relative_eq!(result.y, 3.0, epsilon = 1e-12);
    }

    #[test]
    fn test_centroid_two_pixels_midpoint() {
        let mut image = Array2::from_elem((9, 9), 0.0);
        image[[1, 2]] = 40.0;
        image[[6, 7]] = 40.0;

        let result = flux_weighted_centroid(&image.view()).unwrap();

        assert_relative_eq!(result.x, 4.5, epsilon = 1e-12);
        assert_relative_eq!(result.y, 3.5, epsilon = 1e-12);
    }

    #[test]
    fn test_centroid_symmetric_pattern() {
        let mut image = Array2::from_elem((5, 5), 0.0);

        // Symmetric cross pattern
        image[[2, 1]] = 50.0;
        image[[2, 2]] = 100.0;
        image[[2, 3]] = 50.0;
        image[[1, 2]] = 50.0;
        image[[3, 2]] = 50.0;

        let result = flux_weighted_centroid(&image.view()).unwrap();

        assert_relative_eq!(result.x, 2.0, epsilon = 1e-10);
        assert_relative_eq!(result.y, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_centroid_skips_nan() {
        let mut image = Array2::from_elem((3, 3), f64::NAN);
        image[[0, 2]] = 5.0;

        let result = flux_weighted_centroid(&image.view()).unwrap();

        assert_relative_eq!(result.x, 2.0);
        assert_relative_eq!(result.y, 0.0);
    }

    #[test]
    fn test_centroid_all_nan_is_degenerate() {
        let image = Array2::from_elem((4, 4), f64::NAN);

        let err = flux_weighted_centroid(&image.view()).unwrap_err();

        assert!(matches!(
            err,
            PhotometryError::DegenerateCentroid { valid_pixels: 0, .. }
        ));
    }

    #[test]
    fn test_centroid_zero_weight_is_degenerate() {
        let image = Array2::from_elem((4, 4), 0.0);

        let err = flux_weighted_centroid(&image.view()).unwrap_err();

        assert_eq!(
            err,
            PhotometryError::DegenerateCentroid {
                valid_pixels: 16,
                total_weight: 0.0
            }
        );
    }

    #[test]
    fn test_centroid_empty_region_is_degenerate() {
        let image = Array2::<f64>::zeros((0, 0));
        assert!(flux_weighted_centroid(&image.view()).is_err());
    }

    #[test]
    fn test_centroid_from_mask_matches_unmasked_for_full_mask() {
        let image = Array2::from_shape_fn((7, 9), |(y, x)| 1.0 + (x * y) as f64);
        let mask = Array2::from_elem((7, 9), true);

        let masked = centroid_from_mask(&image.view(), &mask.view()).unwrap();
        let full = flux_weighted_centroid(&image.view()).unwrap();

        assert_relative_eq!(masked.x, full.x, epsilon = 1e-12);
        assert_relative_eq!(masked.y, full.y, epsilon = 1e-12);
    }

    #[test]
    fn test_centroid_from_mask_ignores_unmasked_flux() {
        let mut image = Array2::from_elem((5, 5), 0.0);
        let mut mask = Array2::from_elem((5, 5), false);
        image[[0, 0]] = 1.0e6;
        image[[4, 4]] = 10.0;
        mask[[4, 4]] = true;

        let result = centroid_from_mask(&image.view(), &mask.view()).unwrap();

        assert_relative_eq!(result.x, 4.0);
        assert_relative_eq!(result.y, 4.0);
    }

    #[test]
    #[should_panic(expected = "Image and mask must have same dimensions")]
    fn test_centroid_from_mask_shape_mismatch() {
        let image = Array2::<f64>::zeros((3, 3));
        let mask = Array2::from_elem((3, 4), true);
        let _ = centroid_from_mask(&image.view(), &mask.view());
    }
}
