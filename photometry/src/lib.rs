//! Circular-aperture photometry for faint point sources.
//!
//! The pipeline measures the flux and calibrated magnitude of a compact source
//! sitting on a noisy sky background:
//!
//! 1. Refine the source position with a flux-weighted centroid
//! 2. Select pixels inside a circular aperture and a surrounding sky annulus
//! 3. Estimate the per-pixel sky level with the annulus median
//! 4. Sum the aperture flux and subtract the sky contribution
//! 5. Apply the tabulated aperture correction
//! 6. Convert the flux to Jansky, then to AB and Vega magnitudes
//!
//! # Module Organization
//!
//! - **image**: immutable image container, positions, cutouts and metadata
//! - **image_proc**: centroiding, aperture selection and background estimation
//! - **backend**: interchangeable implementations of the per-stage algorithms
//! - **engine**: orchestration of the stages into a [`PhotometryResult`]
//! - **calibration**: keyed aperture-correction and AB-Vega offset tables
//! - **magnitude**: flux density to AB/Vega magnitude conversion
//! - **units**: surface brightness to flux density conversion
//! - **config_storage** / **io**: JSON loading of calibration tables and images
//! - **radius_range**: source-radius ranges for aperture sweeps

pub mod backend;
pub mod calibration;
pub mod config_storage;
pub mod engine;
pub mod error;
pub mod image;
pub mod image_proc;
pub mod io;
pub mod magnitude;
pub mod radius_range;
pub mod test_util;
pub mod units;

pub use backend::{DirectBackend, MaskedBackend, PhotometryBackend};
pub use calibration::{AbVegaOffsetRow, AbVegaTable, CalibrationParams, CalibrationTable};
pub use engine::{PhotometryEngine, PhotometryRequest, PhotometryResult};
pub use error::{ConfigError, PhotometryError};
pub use image::{Cutout, Image, ImageMetadata, ImageSource, Position};
pub use image_proc::{ApertureGeometry, ApertureSet, BackgroundEstimate};
pub use magnitude::{MagnitudeConverter, Magnitudes};
