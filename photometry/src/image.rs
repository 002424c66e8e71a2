//! Immutable image container, pixel positions and cutouts.
//!
//! Images are stored row-major as `Array2<f64>` indexed `[[y, x]]`, so pixel
//! `(0, 0)` is the first element of the array. NaN marks an invalid pixel and
//! is skipped by every sum, average and selection downstream.

use ndarray::{s, Array2, ArrayView2};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::units::jansky_per_pixel_unit;

/// A continuous position in pixel space.
///
/// Integer values fall on pixel centers (`x` is the column, `y` the row).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    /// Euclidean distance to another position.
    pub fn distance_to(&self, other: &Position) -> f64 {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        (dx * dx + dy * dy).sqrt()
    }

    /// Euclidean distance to the center of pixel `(x, y)`.
    pub fn distance_to_pixel(&self, x: usize, y: usize) -> f64 {
        self.distance_to(&Position::new(x as f64, y as f64))
    }
}

/// Scalar metadata describing how pixel values map to physical units.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageMetadata {
    /// Units identifier of the pixel values, e.g. `"MJy/sr"`.
    pub units: String,
    /// Solid angle subtended by one pixel in steradians.
    pub pixel_solid_angle_sr: f64,
    /// Scale from DN/s to MJy/sr, when the image is in detector units.
    #[serde(default)]
    pub photmjsr: Option<f64>,
}

/// A 2D flux image that is never mutated once built.
#[derive(Debug, Clone, PartialEq)]
pub struct Image {
    data: Array2<f64>,
}

impl Image {
    /// Wrap an array indexed `[[y, x]]`.
    pub fn new(data: Array2<f64>) -> Self {
        Self { data }
    }

    /// Build an image by evaluating `f(x, y)` at every pixel.
    pub fn from_fn<F>(width: usize, height: usize, mut f: F) -> Self
    where
        F: FnMut(usize, usize) -> f64,
    {
        Self::new(Array2::from_shape_fn((height, width), |(y, x)| f(x, y)))
    }

    pub fn view(&self) -> ArrayView2<'_, f64> {
        self.data.view()
    }

    pub fn width(&self) -> usize {
        self.data.ncols()
    }

    pub fn height(&self) -> usize {
        self.data.nrows()
    }

    /// Value at pixel `(x, y)`, or `None` outside the array.
    pub fn get(&self, x: usize, y: usize) -> Option<f64> {
        self.data.get([y, x]).copied()
    }

    /// Number of pixels that are not NaN.
    pub fn valid_pixel_count(&self) -> usize {
        self.data.iter().filter(|v| !v.is_nan()).count()
    }

    /// Center of the pixel grid, `((w - 1) / 2, (h - 1) / 2)`.
    pub fn geometric_center(&self) -> Position {
        Position::new(
            (self.width() as f64 - 1.0) / 2.0,
            (self.height() as f64 - 1.0) / 2.0,
        )
    }

    /// Extract a `size` x `size` region around `center`, clipped to the frame.
    ///
    /// The window starts `size / 2` pixels before the rounded center, so an
    /// even size puts the center pixel just past the middle of the cutout.
    pub fn cutout(&self, center: Position, size: usize) -> Cutout {
        // Window bounds stay in f64 until clamped, so far-off centers give an
        // empty cutout instead of overflowing
        let clip = |c: f64, limit: usize| -> (usize, usize) {
            let start = c.round() - (size / 2) as f64;
            let lo = start.clamp(0.0, limit as f64) as usize;
            let hi = (start + size as f64).clamp(0.0, limit as f64) as usize;
            (lo, hi.max(lo))
        };

        let (x0, x1) = clip(center.x, self.width());
        let (y0, y1) = clip(center.y, self.height());

        if x1 - x0 < size || y1 - y0 < size {
            log::warn!(
                "cutout of {size}x{size} around ({:.1}, {:.1}) clipped to {}x{} by the frame edge",
                center.x,
                center.y,
                x1 - x0,
                y1 - y0
            );
        }

        Cutout {
            image: Image::new(self.data.slice(s![y0..y1, x0..x1]).to_owned()),
            origin_x: x0,
            origin_y: y0,
        }
    }
}

/// A sub-image that remembers where it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct Cutout {
    pub image: Image,
    /// Frame column of the cutout's pixel `(0, 0)`.
    pub origin_x: usize,
    /// Frame row of the cutout's pixel `(0, 0)`.
    pub origin_y: usize,
}

impl Cutout {
    /// Map a cutout-local position to frame coordinates.
    pub fn to_frame(&self, local: Position) -> Position {
        Position::new(
            local.x + self.origin_x as f64,
            local.y + self.origin_y as f64,
        )
    }

    /// Map a frame position to cutout-local coordinates.
    pub fn to_local(&self, frame: Position) -> Position {
        Position::new(
            frame.x - self.origin_x as f64,
            frame.y - self.origin_y as f64,
        )
    }
}

/// An image paired with its metadata, as delivered by a loader.
///
/// Construction checks that the units are understood, so the measurement
/// stages never have to deal with a units failure.
#[derive(Debug, Clone, PartialEq)]
pub struct ImageSource {
    image: Image,
    metadata: ImageMetadata,
    jansky_per_unit: f64,
}

impl ImageSource {
    pub fn new(image: Image, metadata: ImageMetadata) -> Result<Self, ConfigError> {
        let jansky_per_unit = jansky_per_pixel_unit(&metadata)?;
        Ok(Self {
            image,
            metadata,
            jansky_per_unit,
        })
    }

    pub fn image(&self) -> &Image {
        &self.image
    }

    pub fn metadata(&self) -> &ImageMetadata {
        &self.metadata
    }

    /// Factor taking a sum of pixel values to a flux density in Jy.
    pub fn jansky_per_unit(&self) -> f64 {
        self.jansky_per_unit
    }
}
