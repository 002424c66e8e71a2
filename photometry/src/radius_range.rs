//! Source-radius ranges for aperture-correction sweeps.
//!
//! Parsed from `"start:stop:step"` on the command line, e.g. `"1.0:6.0:0.5"`.
//! Only increasing ranges of positive radii make sense here.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::image_proc::ApertureGeometry;

/// Rejected radius ranges.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RangeError {
    #[error("range must be in format 'start:stop:step', got {0:?}")]
    Format(String),
    #[error("invalid {part} value {value:?}")]
    Number { part: &'static str, value: String },
    #[error("radius range needs 0 < start <= stop and step > 0, got {start}:{stop}:{step}")]
    Bounds { start: f64, stop: f64, step: f64 },
}

/// Inclusive, increasing range of aperture radii in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RadiusRange {
    start: f64,
    stop: f64,
    step: f64,
}

impl RadiusRange {
    pub fn new(start: f64, stop: f64, step: f64) -> Result<Self, RangeError> {
        let finite = start.is_finite() && stop.is_finite() && step.is_finite();
        if !finite || start <= 0.0 || step <= 0.0 || start > stop {
            return Err(RangeError::Bounds { start, stop, step });
        }
        Ok(Self { start, stop, step })
    }

    /// All radii from start to stop inclusive.
    ///
    /// Values are computed as `start + i * step` so rounding does not
    /// accumulate. A grid point at most 1e-9 px beyond `stop` is still included.
    pub fn radii(&self) -> Vec<f64> {
        let n = ((self.stop - self.start + 1e-9) / self.step).floor() as usize;
        (0..=n).map(|i| self.start + i as f64 * self.step).collect()
    }

    /// One geometry per radius, sharing a sky annulus.
    ///
    /// Radii reaching into the annulus are kept; the engine rejects them
    /// individually.
    pub fn geometries(&self, r_in: f64, r_out: f64) -> Vec<ApertureGeometry> {
        self.radii()
            .into_iter()
            .map(|r_src| ApertureGeometry { r_src, r_in, r_out })
            .collect()
    }
}

impl FromStr for RadiusRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split(':').collect();
        let [start, stop, step] = parts.as_slice() else {
            return Err(RangeError::Format(s.to_string()));
        };

        let number = |part: &'static str, value: &str| {
            value.trim().parse::<f64>().map_err(|_| RangeError::Number {
                part,
                value: value.to_string(),
            })
        };

        Self::new(
            number("start", start)?,
            number("stop", stop)?,
            number("step", step)?,
        )
    }
}

impl fmt::Display for RadiusRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.start, self.stop, self.step)
    }
}
