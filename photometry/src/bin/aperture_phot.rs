//! Measure the flux and magnitude of a point source in an image file.
//!
//! Images are read with `photometry::io::load_image`; calibration tables come
//! from `~/.aperture_phot` unless `--calibration-dir` is given.

use std::error::Error;
use std::path::PathBuf;

use clap::Parser;
use photometry::backend::{BackendKind, PhotometryBackend};
use photometry::config_storage::ConfigStorage;
use photometry::io::load_image;
use photometry::radius_range::RadiusRange;
use photometry::{
    CalibrationTable, ImageSource, PhotometryEngine, PhotometryRequest, PhotometryResult, Position,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Circular-aperture photometry of a point source")]
struct Args {
    /// Image JSON file
    image: PathBuf,

    /// Filter name (case-insensitive)
    #[arg(short, long, default_value = "F480M")]
    filter: String,

    /// Pupil element
    #[arg(long, default_value = "CLEAR")]
    pupil: String,

    /// Directory holding apcorr.json and abvega_offset.json
    #[arg(long)]
    calibration_dir: Option<PathBuf>,

    /// Approximate source x; requires --y
    #[arg(short, long, requires = "y")]
    x: Option<f64>,

    /// Approximate source y; requires --x
    #[arg(short, long, requires = "x")]
    y: Option<f64>,

    /// Cutout edge length around the approximate position
    #[arg(long)]
    cutout: Option<usize>,

    /// Override the tabulated photometric radius in pixels
    #[arg(long)]
    r_src: Option<f64>,

    /// Skip the aperture correction
    #[arg(long, default_value_t = false)]
    no_apcorr: bool,

    /// Measurement backend
    #[arg(long, value_enum, default_value_t = BackendKind::Direct)]
    backend: BackendKind,

    /// Run every backend and report the largest flux difference
    #[arg(long, default_value_t = false, conflicts_with = "sweep")]
    compare: bool,

    /// Sweep source radii (start:stop:step) with the tabulated sky annulus
    #[arg(long)]
    sweep: Option<RadiusRange>,

    /// Print results as JSON
    #[arg(long, default_value_t = false)]
    json: bool,
}

impl Args {
    fn request(&self) -> PhotometryRequest {
        let mut request = PhotometryRequest::new(&self.filter).with_pupil(&self.pupil);
        if let (Some(x), Some(y)) = (self.x, self.y) {
            request = request.with_position(Position::new(x, y), self.cutout);
        }
        if let Some(radius) = self.r_src {
            request = request.with_source_radius(radius);
        }
        if self.no_apcorr {
            request = request.without_aperture_correction();
        }
        request
    }
}

fn print_result(result: &PhotometryResult) {
    println!("Filter:            {} / {}", result.filter, result.pupil);
    println!("Backend:           {}", result.backend);
    println!(
        "Centroid:          ({:.3}, {:.3})",
        result.centroid.x, result.centroid.y
    );
    println!(
        "Apertures:         r_src={:.3} r_in={:.3} r_out={:.3}",
        result.geometry.r_src, result.geometry.r_in, result.geometry.r_out
    );
    println!(
        "Pixels:            {} source, {} background",
        result.n_source_pixels, result.n_background_pixels
    );
    println!("Median sky:        {:.6e}", result.median_background);
    println!("Raw flux:          {:.6e}", result.raw_source_flux);
    println!("Sky-subtracted:    {:.6e}", result.background_subtracted_flux);
    println!(
        "Corrected (x{:.4}): {:.6e}",
        result.aperture_correction_factor, result.aperture_corrected_flux
    );
    println!("Flux density:      {:.6e} Jy", result.flux_jy);
    println!("AB magnitude:      {:.4}", result.ab_magnitude);
    println!("Vega magnitude:    {:.4}", result.vega_magnitude);
}

fn run_single<B: PhotometryBackend>(
    engine: &PhotometryEngine<B>,
    source: &ImageSource,
    calibration: &CalibrationTable,
    args: &Args,
) -> Result<(), Box<dyn Error>> {
    let result = engine.measure(source, calibration, &args.request())?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&result)?);
    } else {
        print_result(&result);
    }
    Ok(())
}

fn run_compare(
    source: &ImageSource,
    calibration: &CalibrationTable,
    args: &Args,
) -> Result<(), Box<dyn Error>> {
    let request = args.request();
    let results = [BackendKind::Direct, BackendKind::Masked]
        .into_iter()
        .map(|kind| PhotometryEngine::new(kind.build()).measure(source, calibration, &request))
        .collect::<Result<Vec<_>, _>>()?;

    let fluxes: Vec<f64> = results.iter().map(|r| r.flux_jy).collect();
    let max_flux = fluxes.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
    let min_flux = fluxes.iter().cloned().fold(f64::INFINITY, f64::min);

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
    } else {
        for result in &results {
            println!(
                "{:<8} flux {:.6e} Jy  AB {:.4}  Vega {:.4}",
                result.backend, result.flux_jy, result.ab_magnitude, result.vega_magnitude
            );
        }
        println!(
            "Largest relative difference: {:.3e}",
            (max_flux - min_flux) / max_flux.abs()
        );
    }
    Ok(())
}

fn run_sweep<B: PhotometryBackend>(
    engine: &PhotometryEngine<B>,
    source: &ImageSource,
    calibration: &CalibrationTable,
    args: &Args,
    range: &RadiusRange,
) -> Result<(), Box<dyn Error>> {
    let request = args.request();
    let tabulated = calibration.params(&request.filter, &request.pupil)?.geometry()?;
    let geometries = range.geometries(tabulated.r_in, tabulated.r_out);
    let results = engine.sweep(source, calibration, &request, &geometries);

    if args.json {
        let rows: Vec<serde_json::Value> = geometries
            .iter()
            .zip(&results)
            .map(|(geometry, result)| match result {
                Ok(result) => serde_json::json!({ "r_src": geometry.r_src, "result": result }),
                Err(e) => serde_json::json!({ "r_src": geometry.r_src, "error": e.to_string() }),
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&rows)?);
        return Ok(());
    }

    println!(
        "{:>8} {:>14} {:>10} {:>10}",
        "r_src", "flux [Jy]", "AB", "Vega"
    );
    for (geometry, result) in geometries.iter().zip(&results) {
        match result {
            Ok(r) => println!(
                "{:>8.3} {:>14.6e} {:>10.4} {:>10.4}",
                geometry.r_src, r.flux_jy, r.ab_magnitude, r.vega_magnitude
            ),
            Err(e) => println!("{:>8.3} {}", geometry.r_src, e),
        }
    }
    Ok(())
}

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();
    let args = Args::parse();

    let storage = match &args.calibration_dir {
        Some(dir) => ConfigStorage::with_path(dir.clone()),
        None => ConfigStorage::new()?,
    };
    let calibration = storage.load_calibration()?;
    let source = load_image(&args.image)?;
    log::info!(
        "loaded {}x{} image from {}",
        source.image().width(),
        source.image().height(),
        args.image.display()
    );

    if args.compare {
        return run_compare(&source, &calibration, &args);
    }

    let engine = PhotometryEngine::new(args.backend.build());
    match &args.sweep {
        Some(range) => run_sweep(&engine, &source, &calibration, &args, range),
        None => run_single(&engine, &source, &calibration, &args),
    }
}
