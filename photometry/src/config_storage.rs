//! Configuration storage for calibration reference tables.
//!
//! Tables live as JSON files in a single directory, `~/.aperture_phot/` by
//! default:
//!
//! - `apcorr.json`: aperture-correction rows
//! - `abvega_offset.json`: AB-to-Vega offset rows

use std::path::{Path, PathBuf};

use crate::calibration::{
    nircam_aperture_defaults, AbVegaOffsetRow, AbVegaTable, ApertureCorrectionRow,
    CalibrationTable,
};
use crate::error::ConfigError;
use crate::io::{read_json, write_json};

const APERTURE_TABLE_FILE: &str = "apcorr.json";
const ABVEGA_TABLE_FILE: &str = "abvega_offset.json";

/// Locates and loads calibration tables from a root directory.
#[derive(Debug, Clone)]
pub struct ConfigStorage {
    /// Root directory for all calibration files (e.g., ~/.aperture_phot)
    root_path: PathBuf,
}

impl ConfigStorage {
    /// Create a new config storage with default path (~/.aperture_phot)
    pub fn new() -> Result<Self, ConfigError> {
        let home = std::env::var("HOME").map_err(|_| ConfigError::NoHomeDirectory)?;
        let root_path = PathBuf::from(home).join(".aperture_phot");
        Ok(Self { root_path })
    }

    /// Create a new config storage with custom root path
    pub fn with_path(root_path: PathBuf) -> Self {
        Self { root_path }
    }

    pub fn root_path(&self) -> &Path {
        &self.root_path
    }

    pub fn aperture_table_path(&self) -> PathBuf {
        self.root_path.join(APERTURE_TABLE_FILE)
    }

    pub fn abvega_table_path(&self) -> PathBuf {
        self.root_path.join(ABVEGA_TABLE_FILE)
    }

    /// Aperture rows from disk, or the built-in NIRCam rows if no file exists.
    pub fn load_aperture_rows(&self) -> Result<Vec<ApertureCorrectionRow>, ConfigError> {
        let path = self.aperture_table_path();
        if !path.exists() {
            log::info!(
                "no aperture table at {}, using built-in NIRCam rows",
                path.display()
            );
            return Ok(nircam_aperture_defaults());
        }
        read_json(&path)
    }

    /// AB-Vega offsets from disk. There is no built-in fallback.
    pub fn load_abvega_table(&self) -> Result<AbVegaTable, ConfigError> {
        let rows: Vec<AbVegaOffsetRow> = read_json(&self.abvega_table_path())?;
        Ok(AbVegaTable::new(rows))
    }

    /// Both tables, indexed and ready for lookups.
    pub fn load_calibration(&self) -> Result<CalibrationTable, ConfigError> {
        let apertures = self.load_aperture_rows()?;
        let offsets = self.load_abvega_table()?;
        log::debug!(
            "loaded {} aperture rows and {} offset rows from {}",
            apertures.len(),
            offsets.len(),
            self.root_path.display()
        );
        Ok(CalibrationTable::new(apertures, offsets))
    }

    /// Save aperture rows, creating the directory if it doesn't exist.
    pub fn save_aperture_rows(&self, rows: &[ApertureCorrectionRow]) -> Result<(), ConfigError> {
        write_json(&rows, &self.aperture_table_path())
    }

    /// Save AB-Vega offset rows, creating the directory if it doesn't exist.
    pub fn save_abvega_rows(&self, rows: &[AbVegaOffsetRow]) -> Result<(), ConfigError> {
        write_json(&rows, &self.abvega_table_path())
    }
}
