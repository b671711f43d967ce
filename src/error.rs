//! Configuration error shared by component constructors and scenario loading.

use thiserror::Error;

/// Configuration error with field path and constraint description.
///
/// Raised before any tick runs: by component constructors, by fault
/// registration, and by scenario validation.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("config error: {field}: {message}")]
pub struct ConfigError {
    /// Dotted field path (e.g., `"battery.capacity_wh"`).
    pub field: String,
    /// Human-readable constraint description.
    pub message: String,
}

impl ConfigError {
    /// Creates an error for `field` with the given message.
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Returns the same error with `prefix` prepended to the field path.
    ///
    /// Used when a component error surfaces through a scenario section,
    /// e.g. `max_output_w` becomes `solar.max_output_w`.
    pub fn within(mut self, prefix: &str) -> Self {
        self.field = format!("{prefix}.{}", self.field);
        self
    }
}

/// Rejects non-finite values and values below `min`.
pub(crate) fn ensure_at_least(field: &str, value: f64, min: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || value < min {
        return Err(ConfigError::new(field, format!("must be >= {min}, got {value}")));
    }
    Ok(())
}

/// Rejects non-finite values and values outside `[0.0, 1.0]`.
pub(crate) fn ensure_fraction(field: &str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() || !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::new(
            field,
            format!("must be in [0.0, 1.0], got {value}"),
        ));
    }
    Ok(())
}
