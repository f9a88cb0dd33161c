//! In-memory rate store with wholesale snapshot replacement.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::Duration;
use expensegrove_common::{time, CurrencyCode, ExchangeRate, Timestamp};
use parking_lot::RwLock;
use tracing::{debug, info};

use crate::error::{FxError, FxResult};

/// One complete, immutable set of rates.
#[derive(Debug, Clone, Default)]
pub struct RateSnapshot {
    rates: Vec<ExchangeRate>,
    generation: u64,
    updated_at: Option<Timestamp>,
}

impl RateSnapshot {
    /// The empty snapshot held before the first fetch.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Look up a rate by code.
    pub fn get(&self, code: &CurrencyCode) -> Option<&ExchangeRate> {
        self.rates.iter().find(|r| &r.code == code)
    }

    /// Rate value for `code`, treating an unknown code as the base currency.
    pub fn rate_or_base(&self, code: &CurrencyCode) -> f64 {
        self.get(code).map(|r| r.rate).unwrap_or(1.0)
    }

    /// Rates in source order.
    pub fn rates(&self) -> &[ExchangeRate] {
        &self.rates
    }

    /// Check if the snapshot contains `code`.
    pub fn contains(&self, code: &CurrencyCode) -> bool {
        self.get(code).is_some()
    }

    pub fn len(&self) -> usize {
        self.rates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rates.is_empty()
    }

    /// Number of replacements that produced this snapshot (0 = never fetched).
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// When this snapshot was installed.
    pub fn updated_at(&self) -> Option<Timestamp> {
        self.updated_at
    }
}

/// Check the invariants of a full rate set.
pub fn validate_rates(rates: &[ExchangeRate]) -> FxResult<()> {
    let mut seen = HashSet::with_capacity(rates.len());

    for rate in rates {
        rate.validate()?;
        if !seen.insert(&rate.code) {
            return Err(FxError::Parse(format!(
                "Duplicate currency code {} in rate set",
                rate.code
            )));
        }
    }

    Ok(())
}

/// Process-wide holder of the latest rate snapshot.
///
/// The only write is [`RateStore::replace_all`], which swaps the whole
/// snapshot under a short write lock. Readers take an `Arc` to the current
/// snapshot, so a multi-leg computation never mixes two generations.
#[derive(Debug, Default)]
pub struct RateStore {
    current: RwLock<Arc<RateSnapshot>>,
}

impl RateStore {
    /// Create an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the current snapshot.
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.current.read().clone()
    }

    /// Get a rate by code; `None` means the rate is unknown.
    pub fn get_rate(&self, code: &CurrencyCode) -> Option<ExchangeRate> {
        let snapshot = self.snapshot();
        match snapshot.get(code) {
            Some(rate) => {
                debug!(code = %code, "Store hit");
                Some(rate.clone())
            }
            None => {
                debug!(code = %code, "Store miss");
                None
            }
        }
    }

    /// Replace every rate at once. Returns the new generation.
    ///
    /// Invalid sets are rejected and leave the current snapshot untouched.
    pub fn replace_all(&self, rates: Vec<ExchangeRate>) -> FxResult<u64> {
        validate_rates(&rates)?;

        let count = rates.len();
        let mut current = self.current.write();
        let generation = current.generation + 1;
        *current = Arc::new(RateSnapshot {
            rates,
            generation,
            updated_at: Some(time::now()),
        });
        drop(current);

        info!(generation, count, "Rate store replaced");
        Ok(generation)
    }

    /// Copy of the current rates in source order.
    pub fn rates(&self) -> Vec<ExchangeRate> {
        self.snapshot().rates().to_vec()
    }

    pub fn len(&self) -> usize {
        self.current.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.read().is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.current.read().generation()
    }

    pub fn updated_at(&self) -> Option<Timestamp> {
        self.current.read().updated_at()
    }

    /// Check if the store is empty or older than `max_age`.
    pub fn is_stale(&self, max_age: Duration) -> bool {
        match self.updated_at() {
            Some(updated_at) => time::is_stale(updated_at, max_age),
            None => true,
        }
    }

    /// Get store statistics.
    pub fn stats(&self) -> StoreStats {
        let snapshot = self.snapshot();
        StoreStats {
            rate_count: snapshot.len(),
            generation: snapshot.generation(),
            updated_at: snapshot.updated_at(),
        }
    }
}

/// Store statistics.
#[derive(Debug, Clone)]
pub struct StoreStats {
    pub rate_count: usize,
    pub generation: u64,
    pub updated_at: Option<Timestamp>,
}

/// Shared rate store.
pub type SharedRateStore = Arc<RateStore>;
