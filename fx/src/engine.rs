//! Conversion engine: two-hop conversion through the base currency.

use std::sync::Arc;
use std::time::Duration;

use expensegrove_common::time::{self, constants, DurationExt};
use expensegrove_common::{CurrencyCode, Timestamp};
use futures::future::join_all;
use tracing::{debug, instrument, warn};

use crate::error::{FxError, FxResult};
use crate::fetcher::RateFetcher;
use crate::notice::{Notice, Notifier};
use crate::store::{RateSnapshot, SharedRateStore};

/// Convert `amount` from a currency quoted at `from_rate` to one quoted at
/// `to_rate`, both relative to the same base.
pub fn two_hop(amount: f64, from_rate: f64, to_rate: f64) -> f64 {
    (amount / from_rate) * to_rate
}

/// How a conversion result was obtained.
#[derive(Debug, Clone, PartialEq)]
pub enum ConversionQuality {
    /// Source and target are the same currency; amount returned unchanged.
    Identity,
    /// Both rates came from the rate source.
    Exact,
    /// The rate source failed; computed from the store, unknown rates as 1.0.
    Approximate { reason: FxError },
}

/// Result of a single conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct Conversion {
    /// Input amount.
    pub amount: f64,
    pub from: CurrencyCode,
    pub to: CurrencyCode,
    /// Converted amount.
    pub result: f64,
    pub quality: ConversionQuality,
    /// When the conversion was computed.
    pub executed_at: Timestamp,
}

impl Conversion {
    fn new(
        amount: f64,
        from: &CurrencyCode,
        to: &CurrencyCode,
        result: f64,
        quality: ConversionQuality,
    ) -> Self {
        Self {
            amount,
            from: from.clone(),
            to: to.clone(),
            result,
            quality,
            executed_at: time::now(),
        }
    }

    /// Check if the result came from the fallback path.
    pub fn is_approximate(&self) -> bool {
        matches!(self.quality, ConversionQuality::Approximate { .. })
    }

    /// Get the effective rate used.
    pub fn effective_rate(&self) -> f64 {
        if self.amount == 0.0 {
            return 0.0;
        }
        self.result / self.amount
    }
}

/// One slot of a batch conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry {
    /// Target currency.
    pub code: CurrencyCode,
    /// Converted amount, or why this leg failed.
    pub result: FxResult<f64>,
}

impl BatchEntry {
    /// Converted amount, with 0 standing in for a failed leg.
    pub fn value(&self) -> f64 {
        self.result.as_ref().copied().unwrap_or(0.0)
    }

    /// Check if this slot holds the failure placeholder.
    pub fn is_placeholder(&self) -> bool {
        self.result.is_err()
    }
}

/// Converts amounts using the rate source, falling back to the rate store.
pub struct ConversionEngine {
    fetcher: Arc<dyn RateFetcher>,
    store: SharedRateStore,
    notifier: Notifier,
    leg_timeout: Duration,
}

impl ConversionEngine {
    /// Create a new engine.
    pub fn new(fetcher: Arc<dyn RateFetcher>, store: SharedRateStore, notifier: Notifier) -> Self {
        Self {
            fetcher,
            store,
            notifier,
            leg_timeout: constants::conversion_leg_timeout().as_std(),
        }
    }

    /// Set the upper bound on each batch leg.
    pub fn with_leg_timeout(mut self, leg_timeout: Duration) -> Self {
        self.leg_timeout = leg_timeout;
        self
    }

    /// Current store snapshot.
    pub fn snapshot(&self) -> Arc<RateSnapshot> {
        self.store.snapshot()
    }

    /// Convert an amount, never failing.
    ///
    /// When the rate source cannot answer, the result is computed from the
    /// current store snapshot with unknown rates treated as 1.0, flagged as
    /// approximate, and an advisory notice is published.
    #[instrument(skip(self), fields(from = %from, to = %to))]
    pub async fn convert(&self, amount: f64, from: &CurrencyCode, to: &CurrencyCode) -> Conversion {
        if from == to {
            return Conversion::new(amount, from, to, amount, ConversionQuality::Identity);
        }

        match self.fetch_pair(from, to).await {
            Ok((from_rate, to_rate)) => {
                let result = two_hop(amount, from_rate, to_rate);
                debug!(result, "Conversion completed");
                Conversion::new(amount, from, to, result, ConversionQuality::Exact)
            }
            Err(err) => {
                warn!(error = %err, "Conversion failed, using approximate conversion");
                self.notifier
                    .publish(Notice::approximate_conversion(from, to, &err));

                let snapshot = self.store.snapshot();
                let result =
                    two_hop(amount, snapshot.rate_or_base(from), snapshot.rate_or_base(to));
                Conversion::new(
                    amount,
                    from,
                    to,
                    result,
                    ConversionQuality::Approximate { reason: err },
                )
            }
        }
    }

    /// Convert using the rate source only, surfacing any failure.
    pub async fn try_convert(
        &self,
        amount: f64,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> FxResult<f64> {
        if from == to {
            return Ok(amount);
        }

        let (from_rate, to_rate) = self.fetch_pair(from, to).await?;
        Ok(two_hop(amount, from_rate, to_rate))
    }

    /// Convert using the store only. `None` if either rate is unknown.
    pub fn convert_local(
        &self,
        amount: f64,
        from: &CurrencyCode,
        to: &CurrencyCode,
    ) -> Option<f64> {
        if from == to {
            return Some(amount);
        }

        let snapshot = self.store.snapshot();
        let from_rate = snapshot.get(from)?.rate;
        let to_rate = snapshot.get(to)?.rate;
        Some(two_hop(amount, from_rate, to_rate))
    }

    /// Convert `amount` into every currency in the store.
    ///
    /// Legs run concurrently and each is bounded by the leg timeout. A failed
    /// or timed-out leg yields a placeholder slot and never affects the
    /// others. Slots follow store order.
    pub async fn convert_all(&self, amount: f64, from: &CurrencyCode) -> Vec<BatchEntry> {
        let snapshot = self.store.snapshot();
        self.convert_all_in(&snapshot, amount, from).await
    }

    /// Convert `amount` into every currency of `snapshot`.
    #[instrument(skip(self, snapshot), fields(from = %from, generation = snapshot.generation()))]
    pub async fn convert_all_in(
        &self,
        snapshot: &RateSnapshot,
        amount: f64,
        from: &CurrencyCode,
    ) -> Vec<BatchEntry> {
        let legs = snapshot.rates().iter().map(|rate| {
            let code = rate.code.clone();
            async move {
                let result = if &code == from {
                    Ok(amount)
                } else {
                    let leg = self.try_convert(amount, from, &code);
                    match tokio::time::timeout(self.leg_timeout, leg).await {
                        Ok(result) => result,
                        Err(_) => Err(FxError::Network(format!(
                            "Conversion to {} timed out after {:?}",
                            code, self.leg_timeout
                        ))),
                    }
                };

                if let Err(err) = &result {
                    warn!(target_code = %code, error = %err, "Batch conversion leg failed");
                }

                BatchEntry { code, result }
            }
        });

        let entries = join_all(legs).await;
        let failed = entries.iter().filter(|e| e.is_placeholder()).count();
        debug!(total = entries.len(), failed, "Batch conversion completed");
        entries
    }

    async fn fetch_pair(&self, from: &CurrencyCode, to: &CurrencyCode) -> FxResult<(f64, f64)> {
        let (from_rate, to_rate) =
            tokio::try_join!(self.fetcher.fetch_one(from), self.fetcher.fetch_one(to))?;
        Ok((from_rate.rate, to_rate.rate))
    }
}
