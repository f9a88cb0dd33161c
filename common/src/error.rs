//! Error types shared across ExpenseGrove crates.

use thiserror::Error;

/// Errors raised while validating shared currency data.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CommonError {
    /// Currency code is not three ASCII letters.
    #[error("Invalid currency code: {0:?}")]
    InvalidCurrencyCode(String),

    /// Rate is zero, negative, or not a finite number.
    #[error("Invalid rate {rate} for {code}")]
    InvalidRate { code: String, rate: f64 },

    /// The base currency must always quote at exactly 1.0.
    #[error("Base currency {code} must have rate 1.0, got {rate}")]
    BaseRateMismatch { code: String, rate: f64 },
}

impl CommonError {
    /// Get error code for logs and API payloads.
    pub fn error_code(&self) -> &'static str {
        match self {
            CommonError::InvalidCurrencyCode(_) => "INVALID_CURRENCY_CODE",
            CommonError::InvalidRate { .. } => "INVALID_RATE",
            CommonError::BaseRateMismatch { .. } => "BASE_RATE_MISMATCH",
        }
    }
}

/// Result type alias for common operations.
pub type Result<T> = std::result::Result<T, CommonError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(
            CommonError::InvalidCurrencyCode("US".into()).error_code(),
            "INVALID_CURRENCY_CODE"
        );
        assert_eq!(
            CommonError::InvalidRate {
                code: "EUR".into(),
                rate: -1.0
            }
            .error_code(),
            "INVALID_RATE"
        );
    }

    #[test]
    fn test_error_display() {
        let err = CommonError::InvalidRate {
            code: "EUR".into(),
            rate: 0.0,
        };
        assert_eq!(err.to_string(), "Invalid rate 0 for EUR");
    }
}
