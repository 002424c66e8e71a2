//! Aperture and sky-annulus pixel selection.
//!
//! Pixels are classified by the Euclidean distance from the continuous center
//! to the pixel center (the "center" method, no partial-pixel weighting):
//!
//! - source: `distance <= r_src`
//! - background: `r_in <= distance <= r_out`
//!
//! Since `r_src < r_in` the two sets never overlap. NaN pixels are left out of
//! both, and pixels beyond the frame edge are simply never visited.

use ndarray::{Array2, ArrayView2, Zip};
use serde::{Deserialize, Serialize};

use crate::error::PhotometryError;
use crate::image::Position;

/// Radii of the measurement aperture and the sky annulus, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ApertureGeometry {
    pub r_src: f64,
    pub r_in: f64,
    pub r_out: f64,
}

impl ApertureGeometry {
    /// Validate and build a geometry.
    ///
    /// # Errors
    ///
    /// [`PhotometryError::InvalidApertureGeometry`] unless
    /// `0 < r_src < r_in < r_out` with all radii finite.
    pub fn new(r_src: f64, r_in: f64, r_out: f64) -> Result<Self, PhotometryError> {
        let geometry = Self { r_src, r_in, r_out };
        geometry.validate()?;
        Ok(geometry)
    }

    /// Re-check the ordering, e.g. after deserializing.
    pub fn validate(&self) -> Result<(), PhotometryError> {
        let finite = self.r_src.is_finite() && self.r_in.is_finite() && self.r_out.is_finite();
        if !finite || self.r_src <= 0.0 || self.r_src >= self.r_in || self.r_in >= self.r_out {
            return Err(PhotometryError::InvalidApertureGeometry {
                r_src: self.r_src,
                r_in: self.r_in,
                r_out: self.r_out,
            });
        }
        Ok(())
    }

    /// Same sky annulus with a different source radius.
    pub fn with_source_radius(&self, r_src: f64) -> Result<Self, PhotometryError> {
        Self::new(r_src, self.r_in, self.r_out)
    }
}

/// A selected pixel with its value preserved unchanged.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AperturePixel {
    pub x: usize,
    pub y: usize,
    pub flux: f64,
}

/// Source and background pixels for one center and geometry.
#[derive(Debug, Clone, PartialEq)]
pub struct ApertureSet {
    pub center: Position,
    pub geometry: ApertureGeometry,
    pub source: Vec<AperturePixel>,
    pub background: Vec<AperturePixel>,
}

impl ApertureSet {
    pub fn source_fluxes(&self) -> Vec<f64> {
        self.source.iter().map(|p| p.flux).collect()
    }

    pub fn background_fluxes(&self) -> Vec<f64> {
        self.background.iter().map(|p| p.flux).collect()
    }

    /// Sum of the source pixel values.
    pub fn source_sum(&self) -> f64 {
        self.source.iter().map(|p| p.flux).sum()
    }

    /// True if the outer radius reaches past any image edge.
    pub fn clipped_by(&self, width: usize, height: usize) -> bool {
        let r = self.geometry.r_out;
        self.center.x - r < 0.0
            || self.center.y - r < 0.0
            || self.center.x + r > width as f64 - 1.0
            || self.center.y + r > height as f64 - 1.0
    }
}

enum Region {
    Source,
    Background,
    Neither,
}

fn classify(distance: f64, geometry: &ApertureGeometry) -> Region {
    if distance <= geometry.r_src {
        Region::Source
    } else if distance >= geometry.r_in && distance <= geometry.r_out {
        Region::Background
    } else {
        Region::Neither
    }
}

/// Collect pixels from a circular aperture and background annulus.
///
/// Only the bounding box of the outer radius is scanned.
///
/// # Arguments
///
/// * `image` - The image array, indexed `[[y, x]]`
/// * `center` - Aperture center (can be subpixel, can lie off the image)
/// * `geometry` - Source radius and sky annulus radii
///
/// # Errors
///
/// [`PhotometryError::InvalidApertureGeometry`] if the radii are out of order.
pub fn collect_aperture_pixels(
    image: &ArrayView2<f64>,
    center: Position,
    geometry: &ApertureGeometry,
) -> Result<ApertureSet, PhotometryError> {
    geometry.validate()?;

    let (height, width) = image.dim();
    let span = |c: f64, limit: usize| -> (usize, usize) {
        let lo = (c - geometry.r_out).floor().max(0.0);
        let hi = ((c + geometry.r_out).ceil() + 1.0).min(limit as f64);
        if hi <= lo {
            (0, 0)
        } else {
            (lo as usize, hi as usize)
        }
    };
    let (x_min, x_max) = span(center.x, width);
    let (y_min, y_max) = span(center.y, height);

    let mut source = Vec::new();
    let mut background = Vec::new();

    for y in y_min..y_max {
        for x in x_min..x_max {
            let flux = image[[y, x]];
            if flux.is_nan() {
                continue;
            }

            let pixel = AperturePixel { x, y, flux };
            match classify(center.distance_to_pixel(x, y), geometry) {
                Region::Source => source.push(pixel),
                Region::Background => background.push(pixel),
                Region::Neither => {}
            }
        }
    }

    Ok(ApertureSet {
        center,
        geometry: *geometry,
        source,
        background,
    })
}

/// Boolean masks over the whole frame for the source and background regions.
///
/// Returns `(source_mask, background_mask)`; NaN pixels are false in both.
pub fn aperture_masks(
    image: &ArrayView2<f64>,
    center: Position,
    geometry: &ApertureGeometry,
) -> Result<(Array2<bool>, Array2<bool>), PhotometryError> {
    geometry.validate()?;

    let distance = Array2::from_shape_fn(image.dim(), |(y, x)| center.distance_to_pixel(x, y));

    let mut source_mask = Array2::from_elem(image.dim(), false);
    let mut background_mask = Array2::from_elem(image.dim(), false);

    Zip::from(&mut source_mask)
        .and(&mut background_mask)
        .and(image)
        .and(&distance)
        .for_each(|src, bkg, &flux, &d| {
            if flux.is_nan() {
                return;
            }
            match classify(d, geometry) {
                Region::Source => *src = true,
                Region::Background => *bkg = true,
                Region::Neither => {}
            }
        });

    Ok((source_mask, background_mask))
}

/// Mask-based equivalent of [`collect_aperture_pixels`] that scans the whole frame.
pub fn collect_aperture_pixels_masked(
    image: &ArrayView2<f64>,
    center: Position,
    geometry: &ApertureGeometry,
) -> Result<ApertureSet, PhotometryError> {
    let (source_mask, background_mask) = aperture_masks(image, center, geometry)?;

    let gather = |mask: &Array2<bool>| -> Vec<AperturePixel> {
        mask.indexed_iter()
            .filter(|(_, selected)| **selected)
            .map(|((y, x), _)| AperturePixel {
                x,
                y,
                flux: image[[y, x]],
            })
            .collect()
    };

    Ok(ApertureSet {
        center,
        geometry: *geometry,
        source: gather(&source_mask),
        background: gather(&background_mask),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn geometry(r_src: f64, r_in: f64, r_out: f64) -> ApertureGeometry {
        ApertureGeometry::new(r_src, r_in, r_out).unwrap()
    }

    fn coords(pixels: &[AperturePixel]) -> HashSet<(usize, usize)> {
        pixels.iter().map(|p| (p.x, p.y)).collect()
    }

    #[test]
    fn test_geometry_rejects_bad_ordering() {
        let cases = [
            (3.0, 3.0, 5.0),
            (4.0, 3.0, 5.0),
            (2.0, 6.0, 6.0),
            (0.0, 1.0, 2.0),
            (-1.0, 1.0, 2.0),
            (1.0, 2.0, f64::INFINITY),
            (f64::NAN, 2.0, 3.0),
        ];
        for (r_src, r_in, r_out) in cases {
            assert!(
                matches!(
                    ApertureGeometry::new(r_src, r_in, r_out),
                    Err(PhotometryError::InvalidApertureGeometry { .. })
                ),
                "({r_src}, {r_in}, {r_out}) should be rejected"
            );
        }
    }

    #[test]
    fn test_collect_aperture_pixels_basic() {
        let mut image = Array2::<f64>::zeros((20, 20));

        // Set aperture region to 100.0 and annulus to 50.0
        for i in 0..20 {
            for j in 0..20 {
                let dx = j as f64 - 10.0;
                let dy = i as f64 - 10.0;
                let distance = (dx * dx + dy * dy).sqrt();

                if distance <= 2.0 {
                    image[[i, j]] = 100.0;
                } else if (4.0..=6.0).contains(&distance) {
                    image[[i, j]] = 50.0;
                }
            }
        }

        let set = collect_aperture_pixels(
            &image.view(),
            Position::new(10.0, 10.0),
            &geometry(2.0, 4.0, 6.0),
        )
        .unwrap();

        assert!(!set.source.is_empty(), "Aperture should contain pixels");
        assert!(set.source.iter().all(|p| p.flux == 100.0));
        assert!(!set.background.is_empty(), "Background should contain pixels");
        assert!(set.background.iter().all(|p| p.flux == 50.0));
    }

    #[test]
    fn test_boundary_pixels_are_inclusive() {
        let image = Array2::<f64>::ones((21, 21));
        let set = collect_aperture_pixels(
            &image.view(),
            Position::new(10.0, 10.0),
            &geometry(2.0, 4.0, 6.0),
        )
        .unwrap();

        let source = coords(&set.source);
        let background = coords(&set.background);

        // Exactly r_src, r_in and r_out away along the row
        assert!(source.contains(&(12, 10)));
        assert!(background.contains(&(14, 10)));
        assert!(background.contains(&(16, 10)));
        assert!(!background.contains(&(17, 10)));
        assert!(!source.contains(&(13, 10)) && !background.contains(&(13, 10)));
    }

    #[test]
    fn test_collect_aperture_pixels_subpixel_center() {
        let mut image = Array2::<f64>::ones((20, 20));
        image[[10, 10]] = 999.0;

        let set = collect_aperture_pixels(
            &image.view(),
            Position::new(10.5, 10.3),
            &geometry(1.5, 3.0, 5.0),
        )
        .unwrap();

        assert!(
            set.source_fluxes().contains(&999.0),
            "Should include center pixel with subpixel coordinates"
        );
        let d = set.center.distance_to_pixel(10, 10);
        assert!(d > 0.5 && d < 0.6, "distance measured from continuous center");
    }

    #[test]
    fn test_collect_aperture_pixels_edge_clipping() {
        let image = Array2::<f64>::ones((10, 10));

        let set = collect_aperture_pixels(
            &image.view(),
            Position::new(2.0, 2.0),
            &geometry(1.5, 3.0, 4.5),
        )
        .unwrap();

        assert!(!set.source.is_empty());
        assert!(!set.background.is_empty());
        assert!(set.clipped_by(10, 10));
        assert!(set
            .source
            .iter()
            .chain(&set.background)
            .all(|p| p.x < 10 && p.y < 10));
    }

    #[test]
    fn test_center_far_off_image_selects_nothing() {
        let image = Array2::<f64>::ones((10, 10));

        let set = collect_aperture_pixels(
            &image.view(),
            Position::new(-50.0, 200.0),
            &geometry(1.0, 2.0, 3.0),
        )
        .unwrap();

        assert!(set.source.is_empty());
        assert!(set.background.is_empty());
    }

    #[test]
    fn test_nan_pixels_excluded() {
        let mut image = Array2::<f64>::ones((15, 15));
        image[[7, 7]] = f64::NAN;
        image[[7, 11]] = f64::NAN;

        let set = collect_aperture_pixels(
            &image.view(),
            Position::new(7.0, 7.0),
            &geometry(1.0, 3.0, 5.0),
        )
        .unwrap();

        assert!(!coords(&set.source).contains(&(7, 7)));
        assert!(!coords(&set.background).contains(&(11, 7)));
        assert_eq!(set.source.len(), 4);
        assert!(set.source_fluxes().iter().all(|f| !f.is_nan()));
    }

    #[test]
    fn test_collect_aperture_pixels_counts() {
        let image = Array2::<f64>::zeros((30, 30));

        let set = collect_aperture_pixels(
            &image.view(),
            Position::new(15.0, 15.0),
            &geometry(3.0, 6.0, 9.0),
        )
        .unwrap();

        // Aperture should have roughly pi * r^2 pixels
        let expected_aperture = (std::f64::consts::PI * 3.0 * 3.0) as usize;
        assert!(
            set.source.len() >= expected_aperture - 5 && set.source.len() <= expected_aperture + 5,
            "Aperture pixel count {} should be near {}",
            set.source.len(),
            expected_aperture
        );
        assert!(set.background.len() > 50, "Background should have many pixels");
    }

    #[test]
    fn test_source_and_background_disjoint() {
        let image = Array2::<f64>::ones((40, 40));
        let centers = [(20.0, 20.0), (3.3, 7.9), (38.6, 0.2), (19.5, 20.5)];
        let radii = [(1.0, 1.5, 2.0), (4.2, 4.3, 9.0), (8.0, 12.0, 20.0)];

        for &(cx, cy) in &centers {
            for &(r_src, r_in, r_out) in &radii {
                let set = collect_aperture_pixels(
                    &image.view(),
                    Position::new(cx, cy),
                    &geometry(r_src, r_in, r_out),
                )
                .unwrap();
                let overlap: Vec<_> = coords(&set.source)
                    .intersection(&coords(&set.background))
                    .copied()
                    .collect();
                assert!(overlap.is_empty(), "overlap at ({cx}, {cy}): {overlap:?}");
            }
        }
    }

    #[test]
    fn test_growing_source_radius_keeps_pixels() {
        let image = Array2::<f64>::ones((50, 50));
        let center = Position::new(24.3, 25.8);

        let mut previous: HashSet<(usize, usize)> = HashSet::new();
        for step in 1..=20 {
            let r_src = step as f64 * 0.5;
            let set =
                collect_aperture_pixels(&image.view(), center, &geometry(r_src, 11.0, 14.0))
                    .unwrap();
            let current = coords(&set.source);
            assert!(
                previous.is_subset(&current),
                "r_src={r_src} dropped pixels"
            );
            previous = current;
        }
    }

    #[test]
    fn test_masked_matches_direct() {
        let mut image = Array2::from_shape_fn((33, 27), |(y, x)| (x + 3 * y) as f64 * 0.1);
        image[[12, 9]] = f64::NAN;
        image[[20, 15]] = f64::NAN;

        for &(cx, cy) in &[(13.0, 16.0), (13.4, 15.6), (1.0, 30.0), (26.9, 0.1)] {
            let center = Position::new(cx, cy);
            let g = geometry(3.5, 5.0, 8.25);

            let direct = collect_aperture_pixels(&image.view(), center, &g).unwrap();
            let masked = collect_aperture_pixels_masked(&image.view(), center, &g).unwrap();

            assert_eq!(direct, masked, "mismatch at ({cx}, {cy})");
        }
    }

    #[test]
    fn test_masks_reject_invalid_geometry() {
        let image = Array2::<f64>::ones((5, 5));
        let bad = ApertureGeometry {
            r_src: 3.0,
            r_in: 2.0,
            r_out: 4.0,
        };
        assert!(aperture_masks(&image.view(), Position::new(2.0, 2.0), &bad).is_err());
        assert!(collect_aperture_pixels(&image.view(), Position::new(2.0, 2.0), &bad).is_err());
    }
}
