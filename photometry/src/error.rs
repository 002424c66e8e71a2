//! Error types for the photometry pipeline and its loaders.

use thiserror::Error;

/// Failures raised by the measurement stages.
///
/// Every variant is terminal for the computation that raised it. The engine
/// surfaces these unchanged so callers can tell which stage failed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PhotometryError {
    /// No positive flux weight to center on.
    #[error("degenerate centroid: {valid_pixels} valid pixels with total weight {total_weight}")]
    DegenerateCentroid {
        /// Number of non-NaN pixels visited.
        valid_pixels: usize,
        /// Sum of the valid pixel values.
        total_weight: f64,
    },

    /// Radii out of order, non-positive, or non-finite.
    #[error(
        "invalid aperture geometry: need 0 < r_src < r_in < r_out, got r_src={r_src}, r_in={r_in}, r_out={r_out}"
    )]
    InvalidApertureGeometry {
        /// Source aperture radius.
        r_src: f64,
        /// Inner sky radius.
        r_in: f64,
        /// Outer sky radius.
        r_out: f64,
    },

    /// The sky annulus contains no valid pixels.
    #[error("empty background sample: no valid pixels between r_in={r_in} and r_out={r_out} of ({x:.2}, {y:.2})")]
    EmptyBackgroundSample {
        /// Annulus center x.
        x: f64,
        /// Annulus center y.
        y: f64,
        /// Inner sky radius.
        r_in: f64,
        /// Outer sky radius.
        r_out: f64,
    },

    /// Flux cannot be placed on a logarithmic scale.
    #[error("non-positive flux {flux} cannot be converted to a magnitude")]
    NonPositiveFlux {
        /// The offending flux value.
        flux: f64,
    },

    /// Calibration lookup did not match exactly one row.
    #[error("calibration lookup for filter={filter}, pupil={pupil} matched {matches} rows, expected 1")]
    AmbiguousCalibrationLookup {
        /// Filter name as looked up.
        filter: String,
        /// Pupil name as looked up.
        pupil: String,
        /// Number of matching rows (0 or more than 1).
        matches: usize,
    },
}

/// Failures while loading calibration tables or images from disk.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The file could not be read.
    #[error("failed to read {path}: {source}")]
    Io {
        /// Path that failed.
        path: String,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// The file was not valid JSON for the expected schema.
    #[error("failed to parse {path}: {source}")]
    Parse {
        /// Path that failed.
        path: String,
        /// Underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Declared image dimensions disagree with the pixel count.
    #[error("image shape {width}x{height} does not match {len} pixel values")]
    ShapeMismatch {
        /// Declared width.
        width: usize,
        /// Declared height.
        height: usize,
        /// Number of values actually present.
        len: usize,
    },

    /// The units string is not one the converter understands.
    #[error("unsupported flux units: {0:?}")]
    UnsupportedUnits(String),

    /// HOME is not set and no explicit calibration directory was given.
    #[error("cannot locate calibration directory: HOME not set")]
    NoHomeDirectory,
}
