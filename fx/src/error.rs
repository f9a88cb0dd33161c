//! FX error types.

use expensegrove_common::{CommonError, CurrencyCode};
use thiserror::Error;

/// Errors raised while fetching or validating exchange rates.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FxError {
    /// Transport failure reaching the rate source.
    #[error("Network error: {0}")]
    Network(String),

    /// Malformed or inconsistent response from the rate source.
    #[error("Parse error: {0}")]
    Parse(String),

    /// The rate source does not know this currency.
    #[error("Currency not found: {0}")]
    NotFound(CurrencyCode),
}

impl FxError {
    /// Check if retrying later may succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FxError::Network(_))
    }

    /// Get error code for notices and logs.
    pub fn error_code(&self) -> &'static str {
        match self {
            FxError::Network(_) => "NETWORK_ERROR",
            FxError::Parse(_) => "PARSE_ERROR",
            FxError::NotFound(_) => "NOT_FOUND",
        }
    }
}

impl From<CommonError> for FxError {
    fn from(err: CommonError) -> Self {
        FxError::Parse(err.to_string())
    }
}

impl From<reqwest::Error> for FxError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            FxError::Parse(err.to_string())
        } else {
            FxError::Network(err.to_string())
        }
    }
}

impl From<serde_json::Error> for FxError {
    fn from(err: serde_json::Error) -> Self {
        FxError::Parse(err.to_string())
    }
}

/// Result type for FX operations.
pub type FxResult<T> = Result<T, FxError>;
