//! ExpenseGrove exchange rates
//!
//! Keeps a process-wide set of exchange rates fresh and converts amounts
//! between currencies for display.
//!
//! # Features
//!
//! - Wholesale-replaced rate store with consistent snapshots
//! - HTTP rate fetcher for the rates API
//! - Two-hop conversion through the base currency, degrading to locally held
//!   rates when the rate source is unavailable
//! - Concurrent batch conversion with per-leg timeouts
//! - Hourly refresh timer plus manual refresh
//! - en-US currency formatting
//!
//! # Example
//!
//! ```rust,ignore
//! use expensegrove_fx::{ExchangeRateService, FxConfig};
//! use expensegrove_common::CurrencyCode;
//!
//! let service = ExchangeRateService::from_config(FxConfig::from_env(), None)?;
//! service.start().await;
//!
//! let conversion = service.convert(100.0, &CurrencyCode::usd(), &CurrencyCode::eur()).await;
//! println!("{}", service.format(conversion.result, Some("EUR")));
//!
//! service.shutdown().await;
//! ```

pub mod config;
pub mod converter;
pub mod engine;
pub mod error;
pub mod fetcher;
pub mod formatter;
pub mod http;
pub mod notice;
pub mod scheduler;
pub mod service;
pub mod store;
pub mod table;

pub use config::FxConfig;
pub use converter::{Converter, ConverterError, ConverterForm, ConverterOutcome};
pub use engine::{BatchEntry, Conversion, ConversionEngine, ConversionQuality};
pub use error::{FxError, FxResult};
pub use fetcher::RateFetcher;
pub use formatter::{format_currency, CurrencyFormatter};
pub use http::HttpRateFetcher;
pub use notice::{Notice, NoticeKind, NoticeLevel, Notifier};
pub use scheduler::{RefreshHandle, RefreshScheduler};
pub use service::{ExchangeRateService, ServiceState};
pub use store::{RateSnapshot, RateStore, SharedRateStore};
pub use table::{RateRow, RatesTable, SortConfig, SortDirection, SortKey};

#[cfg(any(test, feature = "test-utils"))]
pub use fetcher::MockRateFetcher;
