//! Error types for matrix-free operators
//!
//! Provides a unified error type for all matfree crates.

use thiserror::Error;

/// Core error type for operator construction and evaluation
#[derive(Error, Debug)]
pub enum Error {
    /// Invalid parameter provided to a constructor
    #[error("Invalid parameter `{name}`: {reason}")]
    InvalidParameter { name: &'static str, reason: String },

    /// Invalid input data
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Length/shape mismatch between related arguments
    #[error("Shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        context: String,
        expected: usize,
        actual: usize,
    },

    /// Numerical computation error
    #[error("Computation error: {0}")]
    Computation(String),

    /// Execution backend error (device setup, kernel launch, dtype support)
    #[error("Backend error: {0}")]
    Backend(String),

    /// Feature not available
    #[error("Feature not available: {0}")]
    FeatureNotAvailable(String),

    /// Other errors
    #[error("Other error: {0}")]
    Other(#[from] anyhow::Error),
}

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

// Helper functions for common error patterns

impl Error {
    /// Create an error for an invalid parameter value
    pub fn invalid_parameter(name: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidParameter {
            name,
            reason: reason.into(),
        }
    }

    /// Create an error for a parameter that must be strictly positive
    pub fn non_positive(name: &'static str, value: f64) -> Self {
        Self::InvalidParameter {
            name,
            reason: format!("must be strictly positive, got {value}"),
        }
    }

    /// Create an error for a buffer-length mismatch
    pub fn size_mismatch(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        Self::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::invalid_parameter("scheme", "must be one of forward|backward|central");
        assert_eq!(
            err.to_string(),
            "Invalid parameter `scheme`: must be one of forward|backward|central"
        );

        let err = Error::non_positive("sampling", -0.5);
        assert_eq!(
            err.to_string(),
            "Invalid parameter `sampling`: must be strictly positive, got -0.5"
        );

        let err = Error::size_mismatch("stencil input", 100, 99);
        assert_eq!(
            err.to_string(),
            "Shape mismatch in stencil input: expected 100, got 99"
        );

        let err = Error::Computation("singular Vandermonde system".to_string());
        assert_eq!(
            err.to_string(),
            "Computation error: singular Vandermonde system"
        );

        let err = Error::Backend("f64 storage buffers unsupported".to_string());
        assert_eq!(
            err.to_string(),
            "Backend error: f64 storage buffers unsupported"
        );
    }

    #[test]
    fn test_error_from_anyhow() {
        let anyhow_err = anyhow::anyhow!("custom error message");
        let err: Error = anyhow_err.into();
        match err {
            Error::Other(_) => {
                assert!(err.to_string().contains("custom error message"));
            }
            _ => panic!("Wrong error type"),
        }
    }

    #[test]
    fn test_result_type_alias() {
        fn check(succeed: bool) -> Result<i32> {
            if succeed {
                Ok(42)
            } else {
                Err(Error::Computation("test failure".to_string()))
            }
        }

        assert_eq!(check(true).unwrap(), 42);
        assert!(check(false).is_err());
    }
}
