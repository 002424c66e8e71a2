//! Pixel-level measurement stages: centroiding, aperture selection and sky
//! background estimation.
//!
//! All functions here operate on `ndarray` views indexed `[[y, x]]` and treat
//! NaN as an invalid pixel.

pub mod aperture_photometry;
pub mod background;
pub mod centroid;

pub use aperture_photometry::{
    aperture_masks, collect_aperture_pixels, collect_aperture_pixels_masked, ApertureGeometry,
    AperturePixel, ApertureSet,
};
pub use background::{
    estimate_background, estimate_background_by_selection, median_by_selection,
    BackgroundEstimate,
};
pub use centroid::{centroid_from_mask, flux_weighted_centroid};
