//! Synthetic images and calibration tables for tests and demos.

use crate::calibration::{
    nircam_aperture_defaults, AbVegaOffsetRow, AbVegaTable, CalibrationTable, DEFAULT_PUPIL,
};
use crate::image::{Image, ImageMetadata, Position};

/// Constant-valued image.
pub fn flat_image(width: usize, height: usize, value: f64) -> Image {
    Image::from_fn(width, height, |_, _| value)
}

/// Circular Gaussian source on a flat background.
///
/// # Arguments
/// * `width`, `height` - Image size in pixels
/// * `center` - Source center (subpixel)
/// * `peak` - Amplitude above background at the center
/// * `sigma` - Gaussian width in pixels
/// * `background` - Flat sky level added everywhere
pub fn gaussian_source_image(
    width: usize,
    height: usize,
    center: Position,
    peak: f64,
    sigma: f64,
    background: f64,
) -> Image {
    let two_sigma_sq = 2.0 * sigma * sigma;
    Image::from_fn(width, height, |x, y| {
        let dx = x as f64 - center.x;
        let dy = y as f64 - center.y;
        background + peak * (-(dx * dx + dy * dy) / two_sigma_sq).exp()
    })
}

/// Total flux of a 2D Gaussian, `2π σ² · peak`.
pub fn gaussian_total_flux(peak: f64, sigma: f64) -> f64 {
    2.0 * std::f64::consts::PI * sigma * sigma * peak
}

/// Copy of `image` with a NaN frame `border` pixels wide, like the unusable
/// edges of a resampled mosaic.
pub fn with_invalid_border(image: &Image, border: usize) -> Image {
    let (width, height) = (image.width(), image.height());
    let view = image.view();
    Image::from_fn(width, height, |x, y| {
        let inside = x >= border && y >= border && x + border < width && y + border < height;
        if inside {
            view[[y, x]]
        } else {
            f64::NAN
        }
    })
}

/// Surface-brightness metadata with a NIRCam-like long-wavelength pixel area.
pub fn surface_brightness_metadata() -> ImageMetadata {
    ImageMetadata {
        units: "MJy/sr".to_string(),
        pixel_solid_angle_sr: 9.31e-14,
        photmjsr: None,
    }
}

/// Metadata for images already in Jy per pixel.
pub fn jansky_metadata() -> ImageMetadata {
    ImageMetadata {
        units: "Jy".to_string(),
        pixel_solid_angle_sr: 1.0,
        photmjsr: None,
    }
}

/// Default aperture rows plus AB-Vega offsets chosen for tests.
pub fn test_calibration_table() -> CalibrationTable {
    let offset = |filter: &str, ab_vega_offset: f64| AbVegaOffsetRow {
        filter: filter.to_string(),
        pupil: DEFAULT_PUPIL.to_string(),
        ab_vega_offset,
    };
    CalibrationTable::new(
        nircam_aperture_defaults(),
        AbVegaTable::new(vec![offset("F150W", 1.25), offset("F480M", 3.0)]),
    )
}
