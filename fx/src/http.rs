//! HTTP rate fetcher for the ExpenseGrove REST API.

use async_trait::async_trait;
use expensegrove_common::{CurrencyCode, ExchangeRate};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

use crate::config::FxConfig;
use crate::error::{FxError, FxResult};
use crate::fetcher::RateFetcher;
use crate::store::validate_rates;

/// Fetches rates from `GET /exchange-rates` and `GET /exchange-rates/{code}`.
pub struct HttpRateFetcher {
    base_url: String,
    token: Option<String>,
    http: Client,
}

impl HttpRateFetcher {
    /// Create a fetcher with a default HTTP client.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: None,
            http: Client::new(),
        }
    }

    /// Create a fetcher from configuration, applying the request timeout.
    pub fn from_config(config: &FxConfig) -> FxResult<Self> {
        let http = Client::builder()
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| FxError::Network(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            base_url: config.api_url.trim_end_matches('/').to_string(),
            token: config.api_token.clone(),
            http,
        })
    }

    /// Sets the bearer token supplied by the auth service.
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        code: Option<&CurrencyCode>,
    ) -> FxResult<T> {
        let mut req = self.http.get(self.url(path));
        if let Some(token) = &self.token {
            req = req.bearer_auth(token);
        }

        let resp = req.send().await?;
        let status = resp.status();
        let body = resp.text().await?;

        decode_response(status, &body, code)
    }
}

/// Map an HTTP response onto the fetcher error taxonomy.
///
/// `code` is set for single-rate lookups, where 404 means the currency is
/// unknown rather than the endpoint being missing.
pub(crate) fn decode_response<T: DeserializeOwned>(
    status: StatusCode,
    body: &str,
    code: Option<&CurrencyCode>,
) -> FxResult<T> {
    if status.is_success() {
        return Ok(serde_json::from_str(body)?);
    }

    if let (StatusCode::NOT_FOUND, Some(code)) = (status, code) {
        return Err(FxError::NotFound(code.clone()));
    }

    Err(FxError::Network(format!(
        "{} - {}",
        status.as_u16(),
        api_message(body)
    )))
}

/// Error message from an API error body, or the raw body.
fn api_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("message").and_then(|m| m.as_str()).map(String::from))
        .unwrap_or_else(|| {
            if body.is_empty() {
                "Something went wrong".to_string()
            } else {
                body.to_string()
            }
        })
}

#[async_trait]
impl RateFetcher for HttpRateFetcher {
    fn name(&self) -> &str {
        "HTTP"
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn fetch_all(&self) -> FxResult<Vec<ExchangeRate>> {
        let rates: Vec<ExchangeRate> = self.get("/exchange-rates", None).await?;
        validate_rates(&rates)?;
        debug!(count = rates.len(), "Fetched rate set");
        Ok(rates)
    }

    #[instrument(skip(self), fields(code = %code))]
    async fn fetch_one(&self, code: &CurrencyCode) -> FxResult<ExchangeRate> {
        let rate: ExchangeRate = self
            .get(&format!("/exchange-rates/{}", code), Some(code))
            .await?;

        if &rate.code != code {
            warn!(returned = %rate.code, "Rate source answered for a different currency");
            return Err(FxError::Parse(format!(
                "Requested {} but received {}",
                code, rate.code
            )));
        }

        rate.validate()?;
        Ok(rate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RATES_BODY: &str = r#"[
        {"code":"USD","name":"US Dollar","rate":1.0,"date":"2024-01-01T00:00:00Z"},
        {"code":"EUR","name":"Euro","rate":0.91,"date":"2024-01-01T00:00:00Z"}
    ]"#;

    #[test]
    fn test_fetcher_creation() {
        let fetcher = HttpRateFetcher::new("http://localhost:3000/");
        assert_eq!(fetcher.base_url, "http://localhost:3000");
        assert_eq!(fetcher.url("/exchange-rates"), "http://localhost:3000/exchange-rates");
    }

    #[test]
    fn test_fetcher_from_config() {
        let config = FxConfig {
            api_url: "https://rates.example.com/".into(),
            api_token: Some("secret".into()),
            ..Default::default()
        };
        let fetcher = HttpRateFetcher::from_config(&config).unwrap();
        assert_eq!(fetcher.base_url, "https://rates.example.com");
        assert_eq!(fetcher.token.as_deref(), Some("secret"));
    }

    #[test]
    fn test_with_bearer_token() {
        let fetcher = HttpRateFetcher::new("http://localhost:3000").with_bearer_token("abc");
        assert_eq!(fetcher.token, Some("abc".to_string()));
    }

    #[test]
    fn test_decode_success() {
        let rates: Vec<ExchangeRate> = decode_response(StatusCode::OK, RATES_BODY, None).unwrap();
        assert_eq!(rates.len(), 2);
        assert_eq!(rates[1].code, CurrencyCode::eur());
    }

    #[test]
    fn test_decode_malformed_body() {
        let result: FxResult<Vec<ExchangeRate>> = decode_response(StatusCode::OK, "<html>", None);
        assert!(matches!(result, Err(FxError::Parse(_))));

        let bad_code = r#"[{"code":"EU","name":"Euro","rate":0.91,"date":"2024-01-01T00:00:00Z"}]"#;
        let result: FxResult<Vec<ExchangeRate>> = decode_response(StatusCode::OK, bad_code, None);
        assert!(matches!(result, Err(FxError::Parse(_))));
    }

    #[test]
    fn test_decode_not_found_for_single_rate() {
        let code = CurrencyCode::parse("XYZ").unwrap();
        let result: FxResult<ExchangeRate> =
            decode_response(StatusCode::NOT_FOUND, "", Some(&code));
        assert_eq!(result, Err(FxError::NotFound(code)));
    }

    #[test]
    fn test_decode_not_found_for_listing_is_network() {
        let result: FxResult<Vec<ExchangeRate>> =
            decode_response(StatusCode::NOT_FOUND, "", None);
        assert!(matches!(result, Err(FxError::Network(_))));
    }

    #[test]
    fn test_decode_server_error_uses_message() {
        let result: FxResult<Vec<ExchangeRate>> = decode_response(
            StatusCode::SERVICE_UNAVAILABLE,
            r#"{"message":"maintenance"}"#,
            None,
        );
        assert_eq!(result, Err(FxError::Network("503 - maintenance".into())));
    }

    #[test]
    fn test_api_message_fallbacks() {
        assert_eq!(api_message(""), "Something went wrong");
        assert_eq!(api_message("plain text"), "plain text");
    }
}
