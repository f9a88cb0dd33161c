//! Single-pair converter form.

use std::sync::Arc;

use expensegrove_common::{CurrencyCode, ExchangeRate};
use thiserror::Error;
use tracing::{debug, instrument};

use crate::engine::{Conversion, ConversionEngine};

/// Amount pre-filled in a fresh form.
pub const DEFAULT_AMOUNT: &str = "100";

/// Target used when no rate differs from the source.
pub const FALLBACK_TARGET: &str = "EUR";

/// Form validation errors. Messages are shown to the user verbatim.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConverterError {
    #[error("Please fill in all fields to convert.")]
    MissingField,

    #[error("Please enter a valid number.")]
    InvalidAmount(String),

    #[error("Invalid currency code: {0}")]
    InvalidCurrency(String),
}

impl ConverterError {
    /// Get error code for API responses.
    pub fn error_code(&self) -> &'static str {
        match self {
            ConverterError::MissingField => "MISSING_FIELD",
            ConverterError::InvalidAmount(_) => "INVALID_AMOUNT",
            ConverterError::InvalidCurrency(_) => "INVALID_CURRENCY",
        }
    }
}

/// A validated conversion request.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionRequest {
    pub amount: f64,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
}

/// Raw form state as entered by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConverterForm {
    pub amount: String,
    pub from: String,
    pub to: String,
}

impl ConverterForm {
    /// Fresh form: amount 100, source the display currency, target the
    /// first other currency in `rates`.
    pub fn new(display_currency: &str, rates: &[ExchangeRate]) -> Self {
        let from = display_currency.trim().to_ascii_uppercase();
        let to = default_target(rates, &from);
        Self {
            amount: DEFAULT_AMOUNT.to_string(),
            from,
            to,
        }
    }

    /// Exchange source and target.
    pub fn swap(&mut self) {
        std::mem::swap(&mut self.from, &mut self.to);
    }

    /// Validate the form into a request.
    pub fn validate(&self) -> Result<ConversionRequest, ConverterError> {
        let amount = self.amount.trim();
        let from = self.from.trim();
        let to = self.to.trim();

        if amount.is_empty() || from.is_empty() || to.is_empty() {
            return Err(ConverterError::MissingField);
        }

        let amount = match amount.parse::<f64>() {
            Ok(value) if value.is_finite() => value,
            _ => return Err(ConverterError::InvalidAmount(amount.to_string())),
        };

        let from = CurrencyCode::parse(from)
            .map_err(|_| ConverterError::InvalidCurrency(from.to_string()))?;
        let to =
            CurrencyCode::parse(to).map_err(|_| ConverterError::InvalidCurrency(to.to_string()))?;

        Ok(ConversionRequest { amount, from, to })
    }
}

/// First rate whose code differs from `from`, else EUR.
pub fn default_target(rates: &[ExchangeRate], from: &str) -> String {
    rates
        .iter()
        .map(|r| r.code.code())
        .find(|code| !code.eq_ignore_ascii_case(from))
        .unwrap_or(FALLBACK_TARGET)
        .to_string()
}

/// One-line result, e.g. `100 USD = 91.00 EUR`.
pub fn summary(amount: f64, from: &CurrencyCode, to: &CurrencyCode, result: f64) -> String {
    format!("{} {} = {:.2} {}", amount, from, result, to)
}

/// Result of submitting the form.
#[derive(Debug, Clone, PartialEq)]
pub struct ConverterOutcome {
    pub conversion: Conversion,
    pub summary: String,
}

impl ConverterOutcome {
    /// Check if the number is a best-effort approximation.
    pub fn is_approximate(&self) -> bool {
        self.conversion.is_approximate()
    }
}

/// On-demand converter backed by the conversion engine.
pub struct Converter {
    engine: Arc<ConversionEngine>,
}

impl Converter {
    pub fn new(engine: Arc<ConversionEngine>) -> Self {
        Self { engine }
    }

    /// Validate the form and run the conversion.
    ///
    /// Only validation can fail; rate source failures yield an approximate
    /// outcome.
    #[instrument(skip(self))]
    pub async fn submit(&self, form: &ConverterForm) -> Result<ConverterOutcome, ConverterError> {
        let request = form.validate()?;

        let conversion = self
            .engine
            .convert(request.amount, &request.from, &request.to)
            .await;
        let summary = summary(request.amount, &request.from, &request.to, conversion.result);
        debug!(%summary, approximate = conversion.is_approximate(), "Converter submitted");

        Ok(ConverterOutcome {
            conversion,
            summary,
        })
    }
}
