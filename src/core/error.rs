use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ModelError {
    pub fn invalid(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }
}

/// Probability masses of a distribution that do not add up to one.
///
/// Non-fatal: callers log it and carry on with the un-normalized masses.
#[derive(Debug, Clone, Copy, PartialEq, Error)]
#[error("probability masses sum to {total_mass}, expected 1.0")]
pub struct DistributionIntegrityWarning {
    pub total_mass: f64,
}

pub(crate) fn ensure_income(label: &str, value: f64) -> Result<(), ModelError> {
    if !value.is_finite() || value < 0.0 {
        return Err(ModelError::invalid(format!(
            "{label} must be a finite value >= 0, got {value}"
        )));
    }
    Ok(())
}
