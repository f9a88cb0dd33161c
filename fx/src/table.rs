//! Rates table: every currency with the entered amount converted into it.

use std::cmp::Ordering;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use expensegrove_common::CurrencyCode;
use tracing::instrument;

use crate::engine::{BatchEntry, ConversionEngine};
use crate::store::RateSnapshot;

/// Number of currencies in the preview list.
pub const PREVIEW_LEN: usize = 5;

/// Column to sort by.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    #[default]
    Code,
    Name,
    Rate,
    Converted,
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "code" => Ok(SortKey::Code),
            "name" => Ok(SortKey::Name),
            "rate" => Ok(SortKey::Rate),
            "converted" | "convertedamount" => Ok(SortKey::Converted),
            other => Err(format!("Unknown sort column: {other}")),
        }
    }
}

impl fmt::Display for SortKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            SortKey::Code => "code",
            SortKey::Name => "name",
            SortKey::Rate => "rate",
            SortKey::Converted => "converted",
        };
        write!(f, "{}", name)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn toggled(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Current sort state of the table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SortConfig {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortConfig {
    pub fn new(key: SortKey, direction: SortDirection) -> Self {
        Self { key, direction }
    }

    /// Column header click: the same column toggles, a new one starts ascending.
    pub fn request_sort(&mut self, key: SortKey) {
        if self.key == key {
            self.direction = self.direction.toggled();
        } else {
            self.key = key;
            self.direction = SortDirection::Ascending;
        }
    }
}

/// One table row.
#[derive(Debug, Clone, PartialEq)]
pub struct RateRow {
    pub code: CurrencyCode,
    pub name: String,
    pub rate: f64,
    /// Converted amount; `None` before any conversion ran.
    pub converted: Option<f64>,
    /// The conversion leg for this row failed and `converted` is a placeholder.
    pub failed: bool,
}

impl RateRow {
    /// Converted amount for sorting, missing treated as 0.
    pub fn converted_or_zero(&self) -> f64 {
        self.converted.unwrap_or(0.0)
    }

    fn matches(&self, needle: &str) -> bool {
        self.code.code().to_lowercase().contains(needle)
            || self.name.to_lowercase().contains(needle)
    }
}

/// Table contents for one (amount, source) pair.
#[derive(Debug, Clone)]
pub struct RatesTable {
    source: CurrencyCode,
    amount: f64,
    rows: Vec<RateRow>,
}

impl RatesTable {
    /// Rows for every rate in `snapshot`, without converted amounts.
    pub fn from_snapshot(snapshot: &RateSnapshot, source: CurrencyCode, amount: f64) -> Self {
        Self::with_conversions(snapshot, source, amount, &[])
    }

    /// Rows for every rate in `snapshot`, filled from batch `entries`.
    pub fn with_conversions(
        snapshot: &RateSnapshot,
        source: CurrencyCode,
        amount: f64,
        entries: &[BatchEntry],
    ) -> Self {
        let by_code: HashMap<&CurrencyCode, &BatchEntry> =
            entries.iter().map(|e| (&e.code, e)).collect();

        let rows = snapshot
            .rates()
            .iter()
            .map(|rate| {
                let entry = by_code.get(&rate.code);
                RateRow {
                    code: rate.code.clone(),
                    name: rate.name.clone(),
                    rate: rate.rate,
                    converted: entry.map(|e| e.value()),
                    failed: entry.is_some_and(|e| e.is_placeholder()),
                }
            })
            .collect();

        Self {
            source,
            amount,
            rows,
        }
    }

    /// Batch-convert `amount` from `source` and build the table.
    #[instrument(skip(engine))]
    pub async fn load(engine: &ConversionEngine, source: CurrencyCode, amount: f64) -> Self {
        let snapshot = engine.snapshot();
        let entries = engine.convert_all_in(&snapshot, amount, &source).await;
        Self::with_conversions(&snapshot, source, amount, &entries)
    }

    pub fn source(&self) -> &CurrencyCode {
        &self.source
    }

    pub fn amount(&self) -> f64 {
        self.amount
    }

    /// Rows in store order.
    pub fn rows(&self) -> &[RateRow] {
        &self.rows
    }

    /// Rows matching `search` (case-insensitive, code or name), sorted.
    pub fn view(&self, search: &str, sort: SortConfig) -> Vec<&RateRow> {
        let needle = search.to_lowercase();
        let mut rows: Vec<&RateRow> = self
            .rows
            .iter()
            .filter(|row| needle.is_empty() || row.matches(&needle))
            .collect();

        rows.sort_by(|a, b| {
            let ordering = compare(a, b, sort.key);
            match sort.direction {
                SortDirection::Ascending => ordering,
                SortDirection::Descending => ordering.reverse(),
            }
        });
        rows
    }

    /// The first `len` currencies other than the source, by code.
    pub fn preview(&self, len: usize) -> Vec<&RateRow> {
        let mut rows: Vec<&RateRow> = self
            .rows
            .iter()
            .filter(|row| row.code != self.source)
            .collect();
        rows.sort_by(|a, b| a.code.cmp(&b.code));
        rows.truncate(len);
        rows
    }
}

fn compare(a: &RateRow, b: &RateRow, key: SortKey) -> Ordering {
    match key {
        SortKey::Code => a.code.cmp(&b.code),
        SortKey::Name => a.name.cmp(&b.name),
        SortKey::Rate => a.rate.total_cmp(&b.rate),
        SortKey::Converted => a.converted_or_zero().total_cmp(&b.converted_or_zero()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FxError;
    use crate::fetcher::{MockRateFetcher, RateFetcher};
    use crate::notice::Notifier;
    use crate::store::RateStore;
    use expensegrove_common::ExchangeRate;
    use std::sync::Arc;

    fn code(s: &str) -> CurrencyCode {
        CurrencyCode::parse(s).unwrap()
    }

    fn snapshot() -> Arc<RateSnapshot> {
        let store = RateStore::new();
        store
            .replace_all(vec![
                ExchangeRate::now(code("USD"), "US Dollar", 1.0),
                ExchangeRate::now(code("GBP"), "British Pound", 0.78),
                ExchangeRate::now(code("EUR"), "Euro", 0.91),
                ExchangeRate::now(code("JPY"), "Japanese Yen", 149.37),
                ExchangeRate::now(code("AUD"), "Australian Dollar", 1.52),
                ExchangeRate::now(code("CAD"), "Canadian Dollar", 1.36),
                ExchangeRate::now(code("INR"), "Indian Rupee", 83.12),
            ])
            .unwrap();
        store.snapshot()
    }

    fn codes(rows: &[&RateRow]) -> Vec<String> {
        rows.iter().map(|r| r.code.to_string()).collect()
    }

    #[test]
    fn test_request_sort_toggles() {
        let mut sort = SortConfig::default();
        assert_eq!(sort, SortConfig::new(SortKey::Code, SortDirection::Ascending));

        sort.request_sort(SortKey::Code);
        assert_eq!(sort.direction, SortDirection::Descending);

        sort.request_sort(SortKey::Rate);
        assert_eq!(sort, SortConfig::new(SortKey::Rate, SortDirection::Ascending));

        sort.request_sort(SortKey::Rate);
        sort.request_sort(SortKey::Rate);
        assert_eq!(sort.direction, SortDirection::Ascending);
    }

    #[test]
    fn test_sort_key_parse() {
        assert_eq!("Name".parse::<SortKey>(), Ok(SortKey::Name));
        assert_eq!("convertedAmount".parse::<SortKey>(), Ok(SortKey::Converted));
        assert!("volume".parse::<SortKey>().is_err());
        assert_eq!(SortKey::Converted.to_string(), "converted");
    }

    #[test]
    fn test_rows_follow_store_order() {
        let table = RatesTable::from_snapshot(&snapshot(), code("USD"), 100.0);
        assert_eq!(table.rows().len(), 7);
        assert_eq!(table.rows()[1].code, code("GBP"));
        assert!(table.rows().iter().all(|r| r.converted.is_none()));
    }

    #[test]
    fn test_search_is_case_insensitive() {
        let table = RatesTable::from_snapshot(&snapshot(), code("USD"), 1.0);

        let dollars = table.view("DOLLAR", SortConfig::default());
        assert_eq!(codes(&dollars), vec!["AUD", "CAD", "USD"]);

        let by_code = table.view("eu", SortConfig::default());
        assert_eq!(codes(&by_code), vec!["EUR"]);

        assert!(table.view("zzz", SortConfig::default()).is_empty());
        assert_eq!(table.view("", SortConfig::default()).len(), 7);
    }

    #[test]
    fn test_sort_by_rate_descending() {
        let table = RatesTable::from_snapshot(&snapshot(), code("USD"), 1.0);

        let rows = table.view("", SortConfig::new(SortKey::Rate, SortDirection::Descending));
        assert_eq!(codes(&rows)[..3], ["JPY", "INR", "AUD"]);
    }

    #[test]
    fn test_sort_by_name() {
        let table = RatesTable::from_snapshot(&snapshot(), code("USD"), 1.0);

        let rows = table.view("", SortConfig::new(SortKey::Name, SortDirection::Ascending));
        assert_eq!(rows[0].name, "Australian Dollar");
        assert_eq!(rows[6].name, "US Dollar");
    }

    #[test]
    fn test_sort_by_converted_treats_missing_as_zero() {
        let snapshot = snapshot();
        let entries = vec![
            BatchEntry { code: code("USD"), result: Ok(100.0) },
            BatchEntry { code: code("EUR"), result: Ok(91.0) },
            BatchEntry { code: code("GBP"), result: Err(FxError::Network("down".into())) },
            BatchEntry { code: code("JPY"), result: Ok(-5.0) },
        ];
        let table = RatesTable::with_conversions(&snapshot, code("USD"), 100.0, &entries);

        let rows = table.view("", SortConfig::new(SortKey::Converted, SortDirection::Ascending));
        assert_eq!(rows[0].code, code("JPY"));
        assert_eq!(codes(&rows)[5..], ["EUR", "USD"]);

        let gbp = table.rows().iter().find(|r| r.code == code("GBP")).unwrap();
        assert!(gbp.failed);
        assert_eq!(gbp.converted, Some(0.0));

        let aud = table.rows().iter().find(|r| r.code == code("AUD")).unwrap();
        assert!(!aud.failed);
        assert_eq!(aud.converted, None);
    }

    #[test]
    fn test_preview_excludes_source_and_sorts_by_code() {
        let table = RatesTable::from_snapshot(&snapshot(), code("EUR"), 1.0);

        let preview = table.preview(PREVIEW_LEN);
        assert_eq!(codes(&preview), vec!["AUD", "CAD", "GBP", "INR", "JPY"]);
    }

    #[tokio::test]
    async fn test_load_runs_batch() {
        let fetcher = Arc::new(MockRateFetcher::with_rates(
            "test",
            &[("USD", 1.0), ("EUR", 0.91), ("GBP", 0.78)],
        ));
        let store = Arc::new(RateStore::new());
        store.replace_all(fetcher.fetch_all().await.unwrap()).unwrap();
        fetcher.fail_code(code("GBP"), FxError::Network("timeout".into()));
        let engine = ConversionEngine::new(fetcher, store, Notifier::default());

        let table = RatesTable::load(&engine, code("USD"), 100.0).await;

        assert_eq!(table.source(), &code("USD"));
        assert_eq!(table.amount(), 100.0);
        assert_eq!(table.rows()[0].converted, Some(100.0));
        assert!((table.rows()[1].converted.unwrap() - 91.0).abs() < 1e-9);
        assert!(table.rows()[2].failed);
    }
}
