//! Error handling for cardiobrain
//!
//! Fatal conditions only. Degraded feature computations are expressed as
//! [`crate::Feature::Unavailable`] and never surface through this type.

use thiserror::Error;

/// Result type alias for cardiobrain operations
pub type CbResult<T> = Result<T, CbError>;

/// Error type for all cardiobrain operations
#[derive(Debug, Clone, PartialEq, Error)]
#[non_exhaustive]
pub enum CbError {
    /// Signal samples are missing, empty or not finite
    #[error("Invalid signal data: {reason}")]
    InvalidSignalData {
        reason: String,
    },

    /// Sampling rate is not a positive finite number
    #[error("Invalid sampling rate: {rate}Hz ({reason})")]
    InvalidSamplingRate {
        rate: f64,
        reason: String,
    },

    /// Not enough samples, beats or segments for the requested computation
    #[error("Insufficient data: {reason}")]
    InsufficientData {
        reason: String,
    },

    /// Computation is undefined for this input (zero variance, zero power, ...)
    #[error("Degenerate segment: {reason}")]
    DegenerateSegment {
        reason: String,
    },

    /// Invalid or inconsistent configuration
    #[error("Configuration error: {message}")]
    ConfigurationError {
        message: String,
    },

    /// Numerical failure inside a processing stage
    #[error("Processing error: {message}")]
    ProcessingError {
        message: String,
    },

    /// Unsupported or malformed input format
    #[error("Format error: {reason}")]
    FormatError {
        reason: String,
    },
}

impl CbError {
    pub fn insufficient(reason: impl Into<String>) -> Self {
        CbError::InsufficientData { reason: reason.into() }
    }

    pub fn degenerate(reason: impl Into<String>) -> Self {
        CbError::DegenerateSegment { reason: reason.into() }
    }

    pub fn processing(message: impl Into<String>) -> Self {
        CbError::ProcessingError { message: message.into() }
    }

    pub fn config(message: impl Into<String>) -> Self {
        CbError::ConfigurationError { message: message.into() }
    }

    pub fn format(reason: impl Into<String>) -> Self {
        CbError::FormatError { reason: reason.into() }
    }
}

/// Convenience macro for creating configuration errors
#[macro_export]
macro_rules! config_error {
    ($($arg:tt)*) => {
        $crate::error::CbError::ConfigurationError {
            message: format!($($arg)*),
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let error = CbError::InvalidSamplingRate {
            rate: -250.0,
            reason: "must be positive".to_string(),
        };
        let display = format!("{}", error);
        assert!(display.contains("Invalid sampling rate"));
        assert!(display.contains("-250"));
        assert!(display.contains("must be positive"));
    }

    #[test]
    fn test_error_equality() {
        assert_eq!(CbError::insufficient("3 peaks"), CbError::insufficient("3 peaks"));
        assert_ne!(CbError::insufficient("3 peaks"), CbError::degenerate("3 peaks"));
    }

    #[test]
    fn test_config_error_macro() {
        let error = config_error!("order {} out of range", 12);
        assert_eq!(
            error,
            CbError::ConfigurationError { message: "order 12 out of range".to_string() }
        );
    }
}
