//! meter-math - Numeric helpers for astronomical image analysis
//!
//! This crate collects the small statistical routines used by the photometry
//! pipeline:
//!
//! - **Statistics** - NaN-aware median and mean
//!
//! # Example
//!
//! ```
//! use meter_math::stats::median;
//!
//! let sky = [1.0, 1.1, 0.9, 250.0, 1.0];
//! assert_eq!(median(&sky).unwrap(), 1.0);
//! ```

pub mod stats;

pub use stats::{mean, median, StatsError};
