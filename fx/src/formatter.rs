//! en-US currency formatting.

use std::sync::Arc;

use expensegrove_common::currency::{symbol_for, BASE_CURRENCY};
use expensegrove_common::SettingsSource;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};

/// Fraction digits shown for every currency.
const FRACTION_DIGITS: u32 = 2;

/// Formats amounts for display, defaulting the currency from settings.
#[derive(Clone, Default)]
pub struct CurrencyFormatter {
    settings: Option<Arc<dyn SettingsSource>>,
}

impl CurrencyFormatter {
    /// Create a formatter with no settings collaborator (display currency USD).
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a formatter reading the display currency from `settings`.
    pub fn with_settings(settings: Arc<dyn SettingsSource>) -> Self {
        Self {
            settings: Some(settings),
        }
    }

    /// The configured display currency, or the base currency.
    pub fn display_currency(&self) -> String {
        self.settings
            .as_ref()
            .and_then(|s| s.display_currency())
            .map(|c| c.trim().to_ascii_uppercase())
            .unwrap_or_else(|| BASE_CURRENCY.to_string())
    }

    /// Format `amount` in `code`, or in the display currency when `code` is
    /// absent or blank. Never fails.
    pub fn format(&self, amount: f64, code: Option<&str>) -> String {
        match code.map(str::trim).filter(|c| !c.is_empty()) {
            Some(code) => format_currency(amount, code),
            None => format_currency(amount, &self.display_currency()),
        }
    }
}

/// Format `amount` as en-US currency: `$1,234.50`, `-€0.99`, `CHF 12.00`.
///
/// Codes without a symbol, including malformed ones, are shown as a prefix.
pub fn format_currency(amount: f64, code: &str) -> String {
    let code = code.trim().to_ascii_uppercase();
    let prefix = match symbol_for(&code) {
        Some(symbol) => symbol.to_string(),
        None => format!("{code} "),
    };

    if amount.is_nan() {
        return format!("{prefix}NaN");
    }

    let digits = if amount.is_infinite() {
        "∞".to_string()
    } else {
        group_digits(&round_abs(amount))
    };

    // Sign follows the input, so small negatives render as "-$0.00"
    if amount.is_sign_negative() {
        format!("-{prefix}{digits}")
    } else {
        format!("{prefix}{digits}")
    }
}

/// Round half away from zero to two places and render the absolute value
/// with exactly two fraction digits.
fn round_abs(amount: f64) -> String {
    match Decimal::from_f64(amount.abs()) {
        Some(value) => {
            let rounded = value
                .round_dp_with_strategy(FRACTION_DIGITS, RoundingStrategy::MidpointAwayFromZero);
            format!("{:.2}", rounded)
        }
        // Beyond Decimal's range; two-place rounding is moot at this magnitude
        None => format!("{:.2}", amount.abs()),
    }
}

/// Insert thousands separators into the integer part of `"1234567.89"`.
fn group_digits(plain: &str) -> String {
    let (int_part, frac_part) = plain.split_once('.').unwrap_or((plain, ""));

    let mut grouped = String::with_capacity(int_part.len() + int_part.len() / 3 + 3);
    for (i, ch) in int_part.chars().enumerate() {
        if i > 0 && (int_part.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }

    if !frac_part.is_empty() {
        grouped.push('.');
        grouped.push_str(frac_part);
    }
    grouped
}

#[cfg(test)]
mod tests {
    use super::*;
    use expensegrove_common::{AppSettings, SharedSettings};

    fn settings_with(currency: &str) -> Arc<dyn SettingsSource> {
        Arc::new(SharedSettings::with_settings(AppSettings {
            currency: currency.to_string(),
            ..Default::default()
        }))
    }

    #[test]
    fn test_format_usd() {
        assert_eq!(format_currency(1234.5, "USD"), "$1,234.50");
        assert_eq!(format_currency(0.0, "USD"), "$0.00");
        assert_eq!(format_currency(1_234_567.891, "USD"), "$1,234,567.89");
        assert_eq!(format_currency(999.999, "USD"), "$1,000.00");
    }

    #[test]
    fn test_format_negative() {
        assert_eq!(format_currency(-1234.5, "USD"), "-$1,234.50");
        assert_eq!(format_currency(-0.001, "USD"), "-$0.00");
        assert_eq!(format_currency(0.001, "USD"), "$0.00");
    }

    #[test]
    fn test_format_rounds_half_away_from_zero() {
        assert_eq!(format_currency(2.125, "USD"), "$2.13");
        assert_eq!(format_currency(-2.125, "USD"), "-$2.13");
    }

    #[test]
    fn test_format_symbols() {
        assert_eq!(format_currency(1234.5, "EUR"), "€1,234.50");
        assert_eq!(format_currency(10.0, "gbp"), "£10.00");
        assert_eq!(format_currency(150.0, "JPY"), "¥150.00");
        assert_eq!(format_currency(5.0, "CAD"), "CA$5.00");
    }

    #[test]
    fn test_format_without_symbol() {
        assert_eq!(format_currency(1234.5, "CHF"), "CHF 1,234.50");
        assert_eq!(format_currency(-3.0, "SEK"), "-SEK 3.00");
    }

    #[test]
    fn test_format_invalid_code_degrades() {
        assert_eq!(format_currency(1234.5, "US"), "US 1,234.50");
        assert_eq!(format_currency(1.0, "dollars"), "DOLLARS 1.00");
    }

    #[test]
    fn test_format_non_finite() {
        assert_eq!(format_currency(f64::NAN, "USD"), "$NaN");
        assert_eq!(format_currency(f64::INFINITY, "EUR"), "€∞");
        assert_eq!(format_currency(f64::NEG_INFINITY, "USD"), "-$∞");
    }

    #[test]
    fn test_format_huge_amount() {
        let formatted = format_currency(1e30, "USD");
        assert!(formatted.starts_with("$1,000,000,000,000,000,"));
        assert!(formatted.ends_with(".00"));
    }

    #[test]
    fn test_group_digits() {
        assert_eq!(group_digits("1.00"), "1.00");
        assert_eq!(group_digits("123.45"), "123.45");
        assert_eq!(group_digits("1234.00"), "1,234.00");
        assert_eq!(group_digits("123456789.00"), "123,456,789.00");
    }

    #[test]
    fn test_formatter_defaults_to_usd() {
        let formatter = CurrencyFormatter::new();
        assert_eq!(formatter.display_currency(), "USD");
        assert_eq!(formatter.format(1234.5, None), "$1,234.50");
        assert_eq!(formatter.format(1234.5, Some("USD")), "$1,234.50");
    }

    #[test]
    fn test_formatter_uses_display_currency() {
        let formatter = CurrencyFormatter::with_settings(settings_with("EUR"));
        assert_eq!(formatter.format(1234.5, None), "€1,234.50");
        assert_eq!(formatter.format(1234.5, Some("")), "€1,234.50");
        assert_eq!(formatter.format(1234.5, Some("GBP")), "£1,234.50");
    }

    #[test]
    fn test_formatter_blank_setting_falls_back() {
        let formatter = CurrencyFormatter::with_settings(settings_with("  "));
        assert_eq!(formatter.display_currency(), "USD");

        let empty: Arc<dyn SettingsSource> = Arc::new(SharedSettings::new());
        assert_eq!(CurrencyFormatter::with_settings(empty).format(2.0, None), "$2.00");
    }
}
