//! Shared helpers for the integration tests

#![allow(dead_code)]

use photometry::test_util::gaussian_source_image;
use photometry::{Image, Position};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::{Distribution, Normal};

pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Adds zero-mean Gaussian read noise; NaN pixels stay NaN.
pub fn with_read_noise(image: &Image, sigma: f64, seed: u64) -> Image {
    let mut rng = StdRng::seed_from_u64(seed);
    let normal = Normal::new(0.0, sigma).expect("valid noise sigma");
    let view = image.view();
    Image::from_fn(image.width(), image.height(), |x, y| {
        view[[y, x]] + normal.sample(&mut rng)
    })
}

/// Point source of unit-sigma Gaussian profile on a flat noisy sky.
pub struct StarField {
    pub width: usize,
    pub height: usize,
    pub star: Position,
    pub peak: f64,
    pub sigma: f64,
    pub sky: f64,
    pub read_noise: f64,
    pub seed: u64,
}

impl Default for StarField {
    fn default() -> Self {
        Self {
            width: 96,
            height: 96,
            star: Position::new(39.6, 55.4),
            peak: 100.0,
            sigma: 1.0,
            sky: 5.0,
            read_noise: 0.5,
            seed: 7,
        }
    }
}

impl StarField {
    pub fn render(&self) -> Image {
        let clean = gaussian_source_image(
            self.width,
            self.height,
            self.star,
            self.peak,
            self.sigma,
            self.sky,
        );
        with_read_noise(&clean, self.read_noise, self.seed)
    }

    /// Cutout hint whose default-size window is centered on the star.
    pub fn hint(&self) -> Position {
        Position::new(40.0, 56.0)
    }

    pub fn total_flux(&self) -> f64 {
        2.0 * std::f64::consts::PI * self.peak * self.sigma * self.sigma
    }
}

pub fn scratch_dir(name: &str) -> std::path::PathBuf {
    std::env::temp_dir().join(format!("photometry_it_{}_{}", name, std::process::id()))
}
