//! Exchange rate records.

use serde::{Deserialize, Serialize};

use crate::currency::CurrencyCode;
use crate::error::CommonError;
use crate::time::{self, Timestamp};

/// Tolerance when checking that the base currency quotes at 1.0.
const BASE_RATE_EPSILON: f64 = 1e-9;

/// Exchange rate of one currency against the base currency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeRate {
    /// Currency code.
    pub code: CurrencyCode,
    /// Display name, e.g. "Euro".
    pub name: String,
    /// Units of `code` per one unit of the base currency.
    pub rate: f64,
    /// When the source last updated this rate.
    pub date: Timestamp,
}

impl ExchangeRate {
    /// Create a new exchange rate.
    pub fn new(code: CurrencyCode, name: impl Into<String>, rate: f64, date: Timestamp) -> Self {
        Self {
            code,
            name: name.into(),
            rate,
            date,
        }
    }

    /// Create a rate dated now.
    pub fn now(code: CurrencyCode, name: impl Into<String>, rate: f64) -> Self {
        Self::new(code, name, rate, time::now())
    }

    /// Check if the rate is usable for conversion.
    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Validate the rate value.
    pub fn validate(&self) -> Result<(), CommonError> {
        if !self.rate.is_finite() || self.rate <= 0.0 {
            return Err(CommonError::InvalidRate {
                code: self.code.to_string(),
                rate: self.rate,
            });
        }

        if self.code.is_base() && (self.rate - 1.0).abs() > BASE_RATE_EPSILON {
            return Err(CommonError::BaseRateMismatch {
                code: self.code.to_string(),
                rate: self.rate,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rate(code: &str, value: f64) -> ExchangeRate {
        ExchangeRate::now(CurrencyCode::parse(code).unwrap(), code, value)
    }

    #[test]
    fn test_valid_rates() {
        assert!(rate("USD", 1.0).is_valid());
        assert!(rate("EUR", 0.91).is_valid());
        assert!(rate("JPY", 149.5).is_valid());
    }

    #[test]
    fn test_non_positive_rates_rejected() {
        assert!(matches!(
            rate("EUR", 0.0).validate(),
            Err(CommonError::InvalidRate { .. })
        ));
        assert!(matches!(
            rate("EUR", -0.91).validate(),
            Err(CommonError::InvalidRate { .. })
        ));
        assert!(matches!(
            rate("EUR", f64::NAN).validate(),
            Err(CommonError::InvalidRate { .. })
        ));
        assert!(matches!(
            rate("EUR", f64::INFINITY).validate(),
            Err(CommonError::InvalidRate { .. })
        ));
    }

    #[test]
    fn test_base_must_be_one() {
        assert!(matches!(
            rate("USD", 1.2).validate(),
            Err(CommonError::BaseRateMismatch { .. })
        ));
    }

    #[test]
    fn test_wire_format() {
        let json = r#"{"code":"eur","name":"Euro","rate":0.91,"date":"2024-01-01T00:00:00Z"}"#;
        let parsed: ExchangeRate = serde_json::from_str(json).unwrap();

        assert_eq!(parsed.code, CurrencyCode::eur());
        assert_eq!(parsed.name, "Euro");
        assert_eq!(parsed.rate, 0.91);
        assert_eq!(parsed.date.to_rfc3339(), "2024-01-01T00:00:00+00:00");
    }
}
