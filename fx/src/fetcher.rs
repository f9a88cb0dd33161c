//! Rate fetcher trait and test implementation.

use async_trait::async_trait;
use expensegrove_common::{CurrencyCode, ExchangeRate};

use crate::error::FxResult;

/// Source of authoritative exchange rates.
///
/// Implementations surface every failure to the caller and never retry
/// internally; retry policy belongs to the scheduler.
#[async_trait]
pub trait RateFetcher: Send + Sync {
    /// Get the fetcher name.
    fn name(&self) -> &str;

    /// Fetch the full rate set, in source order.
    async fn fetch_all(&self) -> FxResult<Vec<ExchangeRate>>;

    /// Fetch a single rate. Unknown codes fail with `FxError::NotFound`.
    async fn fetch_one(&self, code: &CurrencyCode) -> FxResult<ExchangeRate>;
}

/// In-memory fetcher for tests, with failure injection and call counters.
#[cfg(any(test, feature = "test-utils"))]
pub struct MockRateFetcher {
    name: String,
    rates: parking_lot::RwLock<Vec<ExchangeRate>>,
    unavailable: std::sync::atomic::AtomicBool,
    failing: dashmap::DashMap<CurrencyCode, crate::error::FxError>,
    delays: dashmap::DashMap<CurrencyCode, std::time::Duration>,
    all_delay: parking_lot::Mutex<Option<std::time::Duration>>,
    fetch_all_calls: std::sync::atomic::AtomicUsize,
    fetch_one_calls: std::sync::atomic::AtomicUsize,
}

#[cfg(any(test, feature = "test-utils"))]
impl MockRateFetcher {
    /// Create an empty mock fetcher.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            rates: parking_lot::RwLock::new(Vec::new()),
            unavailable: std::sync::atomic::AtomicBool::new(false),
            failing: dashmap::DashMap::new(),
            delays: dashmap::DashMap::new(),
            all_delay: parking_lot::Mutex::new(None),
            fetch_all_calls: std::sync::atomic::AtomicUsize::new(0),
            fetch_one_calls: std::sync::atomic::AtomicUsize::new(0),
        }
    }

    /// Create a mock fetcher serving `(code, rate)` pairs.
    pub fn with_rates(name: impl Into<String>, rates: &[(&str, f64)]) -> Self {
        let fetcher = Self::new(name);
        for (code, rate) in rates {
            if let Ok(code) = CurrencyCode::parse(code) {
                fetcher.set_rate(ExchangeRate::now(code.clone(), code.to_string(), *rate));
            }
        }
        fetcher
    }

    /// Set or replace a rate, keeping its position if already present.
    pub fn set_rate(&self, rate: ExchangeRate) {
        let mut rates = self.rates.write();
        match rates.iter_mut().find(|r| r.code == rate.code) {
            Some(existing) => *existing = rate,
            None => rates.push(rate),
        }
    }

    /// Remove a rate.
    pub fn remove_rate(&self, code: &CurrencyCode) {
        self.rates.write().retain(|r| &r.code != code);
    }

    /// Make every call fail with a network error.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable
            .store(unavailable, std::sync::atomic::Ordering::SeqCst);
    }

    /// Make `fetch_one(code)` fail with `error`.
    pub fn fail_code(&self, code: CurrencyCode, error: crate::error::FxError) {
        self.failing.insert(code, error);
    }

    /// Delay `fetch_one(code)` by `delay`.
    pub fn delay_code(&self, code: CurrencyCode, delay: std::time::Duration) {
        self.delays.insert(code, delay);
    }

    /// Delay `fetch_all` by `delay`. The rate set is captured when the call
    /// starts, so a delayed call returns the rates as they were at that point.
    pub fn delay_all(&self, delay: Option<std::time::Duration>) {
        *self.all_delay.lock() = delay;
    }

    pub fn fetch_all_calls(&self) -> usize {
        self.fetch_all_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    pub fn fetch_one_calls(&self) -> usize {
        self.fetch_one_calls.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn check_available(&self) -> FxResult<()> {
        if self.unavailable.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(crate::error::FxError::Network(format!(
                "{} is unavailable",
                self.name
            )));
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
#[async_trait]
impl RateFetcher for MockRateFetcher {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch_all(&self) -> FxResult<Vec<ExchangeRate>> {
        self.fetch_all_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        self.check_available()?;

        let rates = self.rates.read().clone();
        let delay = *self.all_delay.lock();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(rates)
    }

    async fn fetch_one(&self, code: &CurrencyCode) -> FxResult<ExchangeRate> {
        self.fetch_one_calls
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);

        let delay = self.delays.get(code).map(|d| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        self.check_available()?;

        if let Some(err) = self.failing.get(code) {
            return Err(err.clone());
        }

        self.rates
            .read()
            .iter()
            .find(|r| &r.code == code)
            .cloned()
            .ok_or_else(|| crate::error::FxError::NotFound(code.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxError;

    #[tokio::test]
    async fn test_mock_fetch_all_preserves_order() {
        let fetcher =
            MockRateFetcher::with_rates("test", &[("USD", 1.0), ("EUR", 0.91), ("GBP", 0.78)]);

        let rates = fetcher.fetch_all().await.unwrap();
        let codes: Vec<&str> = rates.iter().map(|r| r.code.code()).collect();

        assert_eq!(codes, vec!["USD", "EUR", "GBP"]);
        assert_eq!(fetcher.fetch_all_calls(), 1);
    }

    #[tokio::test]
    async fn test_mock_fetch_one() {
        let fetcher = MockRateFetcher::with_rates("test", &[("USD", 1.0), ("EUR", 0.91)]);

        let eur = fetcher.fetch_one(&CurrencyCode::eur()).await.unwrap();
        assert_eq!(eur.rate, 0.91);

        let missing = fetcher.fetch_one(&CurrencyCode::jpy()).await;
        assert_eq!(missing, Err(FxError::NotFound(CurrencyCode::jpy())));
        assert_eq!(fetcher.fetch_one_calls(), 2);
    }

    #[tokio::test]
    async fn test_mock_failure_injection() {
        let fetcher = MockRateFetcher::with_rates("test", &[("USD", 1.0), ("EUR", 0.91)]);
        fetcher.fail_code(CurrencyCode::eur(), FxError::Parse("garbled".into()));

        assert!(matches!(
            fetcher.fetch_one(&CurrencyCode::eur()).await,
            Err(FxError::Parse(_))
        ));
        assert!(fetcher.fetch_one(&CurrencyCode::usd()).await.is_ok());

        fetcher.set_unavailable(true);
        assert!(matches!(fetcher.fetch_all().await, Err(FxError::Network(_))));
        assert!(matches!(
            fetcher.fetch_one(&CurrencyCode::usd()).await,
            Err(FxError::Network(_))
        ));
    }

    #[tokio::test]
    async fn test_mock_set_rate_replaces_in_place() {
        let fetcher = MockRateFetcher::with_rates("test", &[("USD", 1.0), ("EUR", 0.91)]);
        fetcher.set_rate(ExchangeRate::now(CurrencyCode::eur(), "Euro", 0.95));
        fetcher.remove_rate(&CurrencyCode::usd());

        let rates = fetcher.fetch_all().await.unwrap();
        assert_eq!(rates.len(), 1);
        assert_eq!(rates[0].rate, 0.95);
        assert_eq!(rates[0].name, "Euro");
    }
}
