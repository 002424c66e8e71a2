//! JSON storage for images and generic JSON file helpers.
//!
//! Image files hold the pixel values row-major with `null` standing in for
//! invalid pixels, since JSON cannot carry NaN:
//!
//! ```json
//! {
//!   "width": 3, "height": 2,
//!   "data": [1.0, 2.0, null, 4.0, 5.0, 6.0],
//!   "metadata": {"units": "MJy/sr", "pixel_solid_angle_sr": 9.31e-14}
//! }
//! ```

use std::path::Path;

use ndarray::Array2;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::image::{Image, ImageMetadata, ImageSource};

/// On-disk representation of an [`ImageSource`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageFile {
    pub width: usize,
    pub height: usize,
    pub data: Vec<Option<f64>>,
    pub metadata: ImageMetadata,
}

impl ImageFile {
    pub fn from_source(source: &ImageSource) -> Self {
        let image = source.image();
        Self {
            width: image.width(),
            height: image.height(),
            data: image
                .view()
                .iter()
                .map(|&v| if v.is_nan() { None } else { Some(v) })
                .collect(),
            metadata: source.metadata().clone(),
        }
    }

    /// Validate the shape and units and build the in-memory image.
    pub fn into_source(self) -> Result<ImageSource, ConfigError> {
        let shape_error = ConfigError::ShapeMismatch {
            width: self.width,
            height: self.height,
            len: self.data.len(),
        };
        let values: Vec<f64> = self
            .data
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        let data =
            Array2::from_shape_vec((self.height, self.width), values).map_err(|_| shape_error)?;

        ImageSource::new(Image::new(data), self.metadata)
    }
}

pub(crate) fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, ConfigError> {
    let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.display().to_string(),
        source,
    })?;
    serde_json::from_str(&json).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })
}

pub(crate) fn write_json<T: Serialize>(value: &T, path: &Path) -> Result<(), ConfigError> {
    let io_error = |source: std::io::Error| ConfigError::Io {
        path: path.display().to_string(),
        source,
    };
    let json = serde_json::to_string_pretty(value).map_err(|source| ConfigError::Parse {
        path: path.display().to_string(),
        source,
    })?;
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(io_error)?;
    }
    std::fs::write(path, json).map_err(io_error)
}

/// Load an image file written by [`save_image`] or an external converter.
pub fn load_image(path: &Path) -> Result<ImageSource, ConfigError> {
    let file: ImageFile = read_json(path)?;
    log::debug!(
        "loaded {}x{} image in {} from {}",
        file.width,
        file.height,
        file.metadata.units,
        path.display()
    );
    file.into_source()
}

/// Save an image, creating parent directories as needed.
pub fn save_image(source: &ImageSource, path: &Path) -> Result<(), ConfigError> {
    write_json(&ImageFile::from_source(source), path)
}
