//! Error types for the aggregation engine

use thiserror::Error;

/// Main error type for the aggregation engine
#[derive(Error, Debug)]
pub enum Error {
    /// Fewer valid windows exist in the requested range than the caller asked for
    #[error("Not enough valid windows: {num_valid} available, {required} required")]
    NotEnoughValidWindows {
        /// Number of valid windows found in the requested range
        num_valid: usize,
        /// Number of windows the caller required
        required: usize,
    },

    /// Caller-supplied argument is out of the accepted domain
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A branch that should be unreachable was taken. Always a defect.
    #[error("Internal inconsistency: {0}")]
    Inconsistency(String),
}

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::NotEnoughValidWindows {
            num_valid: 3,
            required: 20,
        };
        assert!(err.to_string().contains("3 available"));
        assert!(err.to_string().contains("20 required"));

        let err = Error::InvalidArgument("numWindows must be positive".to_string());
        assert!(err.to_string().contains("numWindows"));
    }
}
