//! Orchestration of the photometry stages.
//!
//! ```text
//! image ─▶ centroid ─▶ aperture/annulus selection ─▶ median sky
//!       ─▶ raw sum − sky total ─▶ × aperture correction ─▶ Jy ─▶ AB / Vega
//! ```
//!
//! Any stage failure aborts the measurement and is returned unchanged; no
//! partial result is produced.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::backend::{DirectBackend, PhotometryBackend};
use crate::calibration::{CalibrationParams, CalibrationTable, DEFAULT_PUPIL};
use crate::error::PhotometryError;
use crate::image::{Image, ImageSource, Position};
use crate::image_proc::{ApertureGeometry, BackgroundEstimate};
use crate::magnitude::MagnitudeConverter;

/// Cutout edge length used when only an approximate position is given.
pub const DEFAULT_CUTOUT_SIZE: usize = 68;

fn default_pupil() -> String {
    DEFAULT_PUPIL.to_string()
}

fn default_true() -> bool {
    true
}

/// What to measure and how.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotometryRequest {
    pub filter: String,
    #[serde(default = "default_pupil")]
    pub pupil: String,
    /// Rough source position in frame coordinates. When set, the
    /// measurement runs on a cutout around it.
    #[serde(default)]
    pub approx_position: Option<Position>,
    /// Cutout edge length, defaults to [`DEFAULT_CUTOUT_SIZE`].
    #[serde(default)]
    pub cutout_size: Option<usize>,
    /// Replaces the tabulated photometric radius.
    #[serde(default)]
    pub source_radius: Option<f64>,
    #[serde(default = "default_true")]
    pub apply_aperture_correction: bool,
}

impl PhotometryRequest {
    pub fn new(filter: impl Into<String>) -> Self {
        Self {
            filter: filter.into(),
            pupil: default_pupil(),
            approx_position: None,
            cutout_size: None,
            source_radius: None,
            apply_aperture_correction: true,
        }
    }

    pub fn with_pupil(mut self, pupil: impl Into<String>) -> Self {
        self.pupil = pupil.into();
        self
    }

    pub fn with_position(mut self, position: Position, cutout_size: Option<usize>) -> Self {
        self.approx_position = Some(position);
        self.cutout_size = cutout_size;
        self
    }

    pub fn with_source_radius(mut self, radius: f64) -> Self {
        self.source_radius = Some(radius);
        self
    }

    pub fn without_aperture_correction(mut self) -> Self {
        self.apply_aperture_correction = false;
        self
    }
}

/// Flux-domain quantities for one image, center and geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FluxMeasurement {
    /// Centroid in the coordinates of the measured image
    pub centroid: Position,
    pub geometry: ApertureGeometry,
    pub background: BackgroundEstimate,
    pub raw_source_flux: f64,
    pub background_subtracted_flux: f64,
    pub aperture_correction_factor: f64,
    pub aperture_corrected_flux: f64,
}

/// Final record of one photometric measurement.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhotometryResult {
    pub filter: String,
    pub pupil: String,
    pub backend: String,
    /// Refined source position in frame coordinates
    pub centroid: Position,
    pub geometry: ApertureGeometry,
    pub n_source_pixels: usize,
    pub n_background_pixels: usize,
    pub median_background: f64,
    pub total_background: f64,
    pub raw_source_flux: f64,
    pub background_subtracted_flux: f64,
    pub aperture_correction_factor: f64,
    pub aperture_corrected_flux: f64,
    /// Aperture-corrected flux density in Jy
    pub flux_jy: f64,
    pub ab_magnitude: f64,
    pub vega_magnitude: f64,
}

/// Runs the pipeline with a chosen backend.
#[derive(Debug, Clone, Default)]
pub struct PhotometryEngine<B: PhotometryBackend = DirectBackend> {
    backend: B,
}

impl<B: PhotometryBackend> PhotometryEngine<B> {
    pub fn new(backend: B) -> Self {
        Self { backend }
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    /// Centroid, select, subtract sky and apply the aperture correction.
    ///
    /// The centroid is computed over every valid pixel of `image`, so callers
    /// should pass a registration-sized region around the source.
    pub fn measure_flux(
        &self,
        image: &Image,
        geometry: &ApertureGeometry,
        aperture_correction_factor: f64,
    ) -> Result<FluxMeasurement, PhotometryError> {
        let centroid = self.backend.centroid(image)?;
        log::debug!(
            "[{}] centroid at ({:.3}, {:.3})",
            self.backend.name(),
            centroid.x,
            centroid.y
        );

        let set = self.backend.select_apertures(image, centroid, geometry)?;
        if set.clipped_by(image.width(), image.height()) {
            log::warn!(
                "sky annulus r_out={:.2} around ({:.2}, {:.2}) extends past the {}x{} image",
                geometry.r_out,
                centroid.x,
                centroid.y,
                image.width(),
                image.height()
            );
        }
        log::debug!(
            "[{}] {} source pixels, {} background pixels",
            self.backend.name(),
            set.source.len(),
            set.background.len()
        );

        let background = self.backend.estimate_background(&set)?;
        let raw_source_flux = set.source_sum();
        let background_subtracted_flux = raw_source_flux - background.total;
        let aperture_corrected_flux = background_subtracted_flux * aperture_correction_factor;

        log::debug!(
            "[{}] median sky {:.6e} (mean {:.6e}), raw {:.6e}, corrected {:.6e}",
            self.backend.name(),
            background.median,
            background.mean,
            raw_source_flux,
            aperture_corrected_flux
        );

        Ok(FluxMeasurement {
            centroid,
            geometry: *geometry,
            background,
            raw_source_flux,
            background_subtracted_flux,
            aperture_correction_factor,
            aperture_corrected_flux,
        })
    }

    /// Full measurement using the tabulated calibration for the request's filter.
    pub fn measure(
        &self,
        source: &ImageSource,
        calibration: &CalibrationTable,
        request: &PhotometryRequest,
    ) -> Result<PhotometryResult, PhotometryError> {
        let params = calibration.params(&request.filter, &request.pupil)?;
        let geometry = match request.source_radius {
            Some(radius) => params.geometry()?.with_source_radius(radius)?,
            None => params.geometry()?,
        };
        self.measure_with_geometry(source, calibration, &params, request, geometry)
    }

    /// Full measurement with an explicit geometry instead of the tabulated radii.
    pub fn measure_at(
        &self,
        source: &ImageSource,
        calibration: &CalibrationTable,
        request: &PhotometryRequest,
        geometry: ApertureGeometry,
    ) -> Result<PhotometryResult, PhotometryError> {
        let params = calibration.params(&request.filter, &request.pupil)?;
        self.measure_with_geometry(source, calibration, &params, request, geometry)
    }

    /// Evaluate several geometries in parallel, one result per geometry in
    /// input order. The request's `source_radius` is ignored.
    pub fn sweep(
        &self,
        source: &ImageSource,
        calibration: &CalibrationTable,
        request: &PhotometryRequest,
        geometries: &[ApertureGeometry],
    ) -> Vec<Result<PhotometryResult, PhotometryError>> {
        log::info!(
            "sweeping {} aperture geometries for {}",
            geometries.len(),
            request.filter
        );

        geometries
            .par_iter()
            .map(|geometry| self.measure_at(source, calibration, request, *geometry))
            .collect()
    }

    fn measure_with_geometry(
        &self,
        source: &ImageSource,
        calibration: &CalibrationTable,
        params: &CalibrationParams,
        request: &PhotometryRequest,
        geometry: ApertureGeometry,
    ) -> Result<PhotometryResult, PhotometryError> {
        let aperture_correction_factor = if request.apply_aperture_correction {
            params.aperture_correction_factor
        } else {
            1.0
        };

        let (flux, centroid) = match request.approx_position {
            Some(position) => {
                let size = request.cutout_size.unwrap_or(DEFAULT_CUTOUT_SIZE);
                let cutout = source.image().cutout(position, size);
                let flux =
                    self.measure_flux(&cutout.image, &geometry, aperture_correction_factor)?;
                let centroid = cutout.to_frame(flux.centroid);
                (flux, centroid)
            }
            None => {
                let flux =
                    self.measure_flux(source.image(), &geometry, aperture_correction_factor)?;
                let centroid = flux.centroid;
                (flux, centroid)
            }
        };

        let flux_jy = flux.aperture_corrected_flux * source.jansky_per_unit();
        let magnitudes = MagnitudeConverter::new(calibration.offsets()).convert(
            flux_jy,
            &params.filter_name,
            &params.pupil,
        )?;

        log::info!(
            "{} ({}): flux {:.6e} Jy, AB {:.3}, Vega {:.3}",
            params.filter_name,
            self.backend.name(),
            flux_jy,
            magnitudes.ab,
            magnitudes.vega
        );

        Ok(PhotometryResult {
            filter: params.filter_name.clone(),
            pupil: params.pupil.clone(),
            backend: self.backend.name().to_string(),
            centroid,
            geometry,
            n_source_pixels: flux.background.n_source_pixels,
            n_background_pixels: flux.background.n_background_pixels,
            median_background: flux.background.median,
            total_background: flux.background.total,
            raw_source_flux: flux.raw_source_flux,
            background_subtracted_flux: flux.background_subtracted_flux,
            aperture_correction_factor: flux.aperture_correction_factor,
            aperture_corrected_flux: flux.aperture_corrected_flux,
            flux_jy,
            ab_magnitude: magnitudes.ab,
            vega_magnitude: magnitudes.vega,
        })
    }
}
