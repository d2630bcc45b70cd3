//! Error types for heatwave detection and tracking.

use thiserror::Error;

/// Result type alias using MhwError.
pub type MhwResult<T> = Result<T, MhwError>;

/// Errors raised at a pipeline stage boundary when a precondition is violated.
#[derive(Debug, Error)]
pub enum MhwError {
    /// Requested field missing, shape mismatch, non-cyclic longitude where
    /// wrapping was requested, or an out-of-range parameter.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// An axis with zero length (no cells or no timesteps).
    #[error("degenerate input: {0}")]
    DegenerateInput(String),

    /// Configuration value out of range.
    #[error("configuration error: {0}")]
    Config(String),
}

impl MhwError {
    /// Create an InvalidInput error.
    pub fn invalid_input(msg: impl Into<String>) -> Self {
        Self::InvalidInput(msg.into())
    }

    /// Create a DegenerateInput error.
    pub fn degenerate_input(msg: impl Into<String>) -> Self {
        Self::DegenerateInput(msg.into())
    }

    /// Create a Config error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Shape mismatch between what a stage expects and what it was given.
    pub fn shape_mismatch(what: &str, expected: &[usize], actual: &[usize]) -> Self {
        Self::InvalidInput(format!(
            "{} has shape {:?}, expected {:?}",
            what, actual, expected
        ))
    }
}

impl From<serde_json::Error> for MhwError {
    fn from(err: serde_json::Error) -> Self {
        MhwError::InvalidInput(format!("JSON error: {}", err))
    }
}

impl From<serde_yaml::Error> for MhwError {
    fn from(err: serde_yaml::Error) -> Self {
        MhwError::Config(format!("YAML error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = MhwError::shape_mismatch("field 'sst'", &[2, 3, 4], &[2, 3, 5]);
        assert_eq!(
            err.to_string(),
            "invalid input: field 'sst' has shape [2, 3, 5], expected [2, 3, 4]"
        );
    }

    #[test]
    fn test_constructors() {
        assert!(matches!(MhwError::invalid_input("x"), MhwError::InvalidInput(_)));
        assert!(matches!(MhwError::degenerate_input("x"), MhwError::DegenerateInput(_)));
        assert!(matches!(MhwError::config("x"), MhwError::Config(_)));
    }
}
