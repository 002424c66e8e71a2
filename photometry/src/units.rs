//! Conversion of pixel values to flux density in Jansky.
//!
//! Calibrated images are usually stored as surface brightness (MJy/sr). Summed
//! over an aperture, surface brightness must be multiplied by the solid angle
//! of one pixel to give a flux density. Images still in detector units (DN/s)
//! first go through the photometric scale `PHOTMJSR` (MJy/sr per DN/s).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::image::ImageMetadata;

/// Jansky per megajansky
pub const JY_PER_MJY: f64 = 1.0e6;

/// Units a flux image can be stored in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FluxUnit {
    /// Surface brightness, megajansky per steradian
    MegaJanskyPerSteradian,
    /// Flux density per pixel
    Jansky,
    /// Detector count rate
    DataNumbersPerSecond,
}

impl FromStr for FluxUnit {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mjy/sr" | "mjy sr-1" | "mjy/steradian" => Ok(Self::MegaJanskyPerSteradian),
            "jy" | "jansky" => Ok(Self::Jansky),
            "dn/s" | "dn s-1" | "counts/s" => Ok(Self::DataNumbersPerSecond),
            _ => Err(ConfigError::UnsupportedUnits(s.to_string())),
        }
    }
}

impl fmt::Display for FluxUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::MegaJanskyPerSteradian => "MJy/sr",
            Self::Jansky => "Jy",
            Self::DataNumbersPerSecond => "DN/s",
        };
        write!(f, "{name}")
    }
}

/// Multiplicative factor taking one pixel value in `metadata.units` to Jy.
///
/// # Errors
///
/// [`ConfigError::UnsupportedUnits`] for an unknown units string, or for DN/s
/// data without a `photmjsr` scale.
pub fn jansky_per_pixel_unit(metadata: &ImageMetadata) -> Result<f64, ConfigError> {
    let unit: FluxUnit = metadata.units.parse()?;
    let mjsr_to_jy = JY_PER_MJY * metadata.pixel_solid_angle_sr;

    match unit {
        FluxUnit::Jansky => Ok(1.0),
        FluxUnit::MegaJanskyPerSteradian => Ok(mjsr_to_jy),
        FluxUnit::DataNumbersPerSecond => metadata
            .photmjsr
            .map(|photmjsr| photmjsr * mjsr_to_jy)
            .ok_or_else(|| ConfigError::UnsupportedUnits(format!("{unit} without photmjsr"))),
    }
}
