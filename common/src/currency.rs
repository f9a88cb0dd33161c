//! Currency codes and display symbols.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::CommonError;

/// Code of the currency every rate is quoted against.
pub const BASE_CURRENCY: &str = "USD";

/// ISO 4217-like currency code: three ASCII letters, stored uppercase.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct CurrencyCode(String);

impl CurrencyCode {
    /// Parse and normalise a currency code.
    pub fn parse(code: &str) -> Result<Self, CommonError> {
        let trimmed = code.trim();
        if trimmed.len() != 3 || !trimmed.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(CommonError::InvalidCurrencyCode(code.to_string()));
        }
        Ok(Self(trimmed.to_ascii_uppercase()))
    }

    /// Get the currency code.
    pub fn code(&self) -> &str {
        &self.0
    }

    /// Check if this is the base currency.
    pub fn is_base(&self) -> bool {
        self.0 == BASE_CURRENCY
    }

    /// en-US display symbol, if the currency has one distinct from its code.
    pub fn symbol(&self) -> Option<&'static str> {
        symbol_for(&self.0)
    }

    /// The base currency.
    pub fn base() -> Self {
        Self(BASE_CURRENCY.to_string())
    }

    /// Common currencies
    pub fn usd() -> Self {
        Self("USD".to_string())
    }

    pub fn eur() -> Self {
        Self("EUR".to_string())
    }

    pub fn gbp() -> Self {
        Self("GBP".to_string())
    }

    pub fn jpy() -> Self {
        Self("JPY".to_string())
    }
}

/// Symbols used by the en-US currency style.
pub fn symbol_for(code: &str) -> Option<&'static str> {
    let symbol = match code {
        "USD" => "$",
        "EUR" => "€",
        "GBP" => "£",
        "JPY" => "¥",
        "INR" => "₹",
        "CAD" => "CA$",
        "AUD" => "A$",
        "NZD" => "NZ$",
        "HKD" => "HK$",
        "MXN" => "MX$",
        "TWD" => "NT$",
        "BRL" => "R$",
        "CNY" => "CN¥",
        "KRW" => "₩",
        "ILS" => "₪",
        "VND" => "₫",
        "PHP" => "₱",
        _ => return None,
    };
    Some(symbol)
}

impl fmt::Display for CurrencyCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CurrencyCode {
    type Err = CommonError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for CurrencyCode {
    type Error = CommonError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for CurrencyCode {
    type Error = CommonError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<CurrencyCode> for String {
    fn from(code: CurrencyCode) -> Self {
        code.0
    }
}

impl AsRef<str> for CurrencyCode {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalises_case() {
        let code: CurrencyCode = "eur".parse().unwrap();
        assert_eq!(code, CurrencyCode::eur());
        assert_eq!(code.code(), "EUR");
    }

    #[test]
    fn test_parse_trims_whitespace() {
        assert_eq!(CurrencyCode::parse(" gbp ").unwrap(), CurrencyCode::gbp());
    }

    #[test]
    fn test_parse_rejects_bad_codes() {
        for bad in ["", "US", "USDT", "U$D", "12A", "€UR"] {
            assert!(
                matches!(
                    CurrencyCode::parse(bad),
                    Err(CommonError::InvalidCurrencyCode(_))
                ),
                "{bad} should be rejected"
            );
        }
    }

    #[test]
    fn test_symbols() {
        assert_eq!(CurrencyCode::usd().symbol(), Some("$"));
        assert_eq!(CurrencyCode::eur().symbol(), Some("€"));
        assert_eq!(CurrencyCode::parse("CAD").unwrap().symbol(), Some("CA$"));
        assert_eq!(CurrencyCode::parse("CHF").unwrap().symbol(), None);
    }

    #[test]
    fn test_base_currency() {
        assert!(CurrencyCode::base().is_base());
        assert_eq!(CurrencyCode::base(), CurrencyCode::usd());
        assert!(!CurrencyCode::eur().is_base());
    }

    #[test]
    fn test_serde_validates() {
        let code: CurrencyCode = serde_json::from_str("\"jpy\"").unwrap();
        assert_eq!(code, CurrencyCode::jpy());
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"JPY\"");
        assert!(serde_json::from_str::<CurrencyCode>("\"JP\"").is_err());
    }
}
