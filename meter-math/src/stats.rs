//! Statistical functions for background estimation and analysis

use thiserror::Error;

/// Errors from statistical reductions
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StatsError {
    /// No finite-or-infinite (non-NaN) samples were supplied
    #[error("insufficient data: {total} total values, 0 valid (all NaN)")]
    NoValidValues {
        /// Number of values passed in, including NaN
        total: usize,
    },
}

fn valid_values(values: &[f64]) -> Result<Vec<f64>, StatsError> {
    let valid: Vec<f64> = values.iter().filter(|v| !v.is_nan()).copied().collect();
    if valid.is_empty() {
        return Err(StatsError::NoValidValues {
            total: values.len(),
        });
    }
    Ok(valid)
}

/// Calculate median of a slice of f64 values
///
/// NaN values are filtered out while infinite values (±inf) are kept. For
/// even-length data, returns the average of the two middle values.
///
/// # Arguments
///
/// * `values` - Slice of f64 values to compute median from
///
/// # Returns
///
/// * `Ok(median)` - The median value
/// * `Err(StatsError::NoValidValues)` - If no valid values remain after filtering NaN
pub fn median(values: &[f64]) -> Result<f64, StatsError> {
    let mut valid = valid_values(values)?;

    // NaN was filtered above so total_cmp matches numeric order
    valid.sort_by(f64::total_cmp);

    let mid = valid.len() / 2;
    let median_value = if valid.len() % 2 == 0 {
        (valid[mid - 1] + valid[mid]) / 2.0
    } else {
        valid[mid]
    };

    Ok(median_value)
}

/// Arithmetic mean ignoring NaN values
pub fn mean(values: &[f64]) -> Result<f64, StatsError> {
    let valid = valid_values(values)?;
    Ok(valid.iter().sum::<f64>() / valid.len() as f64)
}
