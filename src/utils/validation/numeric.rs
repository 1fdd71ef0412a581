//! Numeric validation utilities
//!
//! Range and finiteness checks shared by the parameter parser and the
//! configuration builder.

use crate::error::{BgRemovalError, Result};

/// Validator for solver and tiling numbers
pub struct NumericValidator;

impl NumericValidator {
    /// Validate that a value is finite (not NaN, not infinite)
    pub fn validate_finite(value: f64, name: &str) -> Result<f64> {
        if !value.is_finite() {
            return Err(BgRemovalError::invalid_config(format!(
                "{} must be finite, got {}",
                name, value
            )));
        }
        Ok(value)
    }

    /// Validate that a value is finite and strictly positive
    pub fn validate_positive(value: f64, name: &str) -> Result<f64> {
        Self::validate_finite(value, name)?;
        if value <= 0.0 {
            return Err(BgRemovalError::config_value_error(name, value, "> 0"));
        }
        Ok(value)
    }

    /// Validate a shift sequence: non-empty and every entry finite
    pub fn validate_shifts(shifts: &[f64]) -> Result<()> {
        if shifts.is_empty() {
            return Err(BgRemovalError::invalid_config(
                "Shift sequence must contain at least one value",
            ));
        }

        for (i, &value) in shifts.iter().enumerate() {
            if !value.is_finite() {
                return Err(BgRemovalError::invalid_config(format!(
                    "Shift at index {} is not finite: {}",
                    i, value
                )));
            }
        }

        Ok(())
    }
}
