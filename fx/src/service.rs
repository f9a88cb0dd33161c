//! Exchange-rate service: one session's store, engine, scheduler and notices.

use std::sync::Arc;

use expensegrove_common::{CurrencyCode, ExchangeRate, SettingsSource};
use parking_lot::{Mutex, RwLock};
use tokio::sync::broadcast;
use tracing::{info, instrument, warn};

use crate::config::FxConfig;
use crate::converter::{Converter, ConverterForm};
use crate::engine::{BatchEntry, Conversion, ConversionEngine};
use crate::error::FxResult;
use crate::fetcher::RateFetcher;
use crate::formatter::CurrencyFormatter;
use crate::http::HttpRateFetcher;
use crate::notice::{Notice, Notifier};
use crate::scheduler::{RefreshHandle, RefreshScheduler};
use crate::store::{RateStore, SharedRateStore};
use crate::table::RatesTable;

/// Service lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServiceState {
    /// Created, not started.
    Idle,
    /// Initial fetch in progress.
    Starting,
    /// Timer armed.
    Running,
    /// Timer being cancelled.
    ShuttingDown,
    /// Timer cancelled. The service cannot be restarted.
    Stopped,
}

impl ServiceState {
    /// Check if the refresh timer is armed.
    pub fn is_running(&self) -> bool {
        matches!(self, ServiceState::Running)
    }

    /// Check if the service is in a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, ServiceState::Stopped)
    }
}

/// Owns the rate subsystem for one session.
///
/// Conversions and formatting work in every state; before the first fetch
/// they see an empty store and degrade accordingly.
pub struct ExchangeRateService {
    config: FxConfig,
    state: RwLock<ServiceState>,
    store: SharedRateStore,
    notifier: Notifier,
    engine: Arc<ConversionEngine>,
    scheduler: Arc<RefreshScheduler>,
    formatter: CurrencyFormatter,
    refresh: Mutex<Option<RefreshHandle>>,
}

impl ExchangeRateService {
    /// Create a service over `fetcher`.
    pub fn new(
        config: FxConfig,
        fetcher: Arc<dyn RateFetcher>,
        settings: Option<Arc<dyn SettingsSource>>,
    ) -> Self {
        let store: SharedRateStore = Arc::new(RateStore::new());
        let notifier = Notifier::new(config.notice_capacity);

        let engine = Arc::new(
            ConversionEngine::new(fetcher.clone(), store.clone(), notifier.clone())
                .with_leg_timeout(config.leg_timeout),
        );
        let scheduler = Arc::new(RefreshScheduler::new(
            fetcher,
            store.clone(),
            notifier.clone(),
            config.refresh_interval,
        ));
        let formatter = match settings {
            Some(settings) => CurrencyFormatter::with_settings(settings),
            None => CurrencyFormatter::new(),
        };

        Self {
            config,
            state: RwLock::new(ServiceState::Idle),
            store,
            notifier,
            engine,
            scheduler,
            formatter,
            refresh: Mutex::new(None),
        }
    }

    /// Create a service talking to the HTTP rates API.
    pub fn from_config(
        config: FxConfig,
        settings: Option<Arc<dyn SettingsSource>>,
    ) -> FxResult<Self> {
        let fetcher = Arc::new(HttpRateFetcher::from_config(&config)?);
        Ok(Self::new(config, fetcher, settings))
    }

    /// Perform the initial fetch and arm the refresh timer.
    ///
    /// Only the first call has any effect. A shutdown requested while the
    /// initial fetch is in flight cancels the timer as soon as it is armed.
    /// If this future is dropped mid-fetch the service returns to `Idle`.
    #[instrument(skip(self), fields(api_url = %self.config.api_url))]
    pub async fn start(&self) {
        {
            let mut state = self.state.write();
            if *state != ServiceState::Idle {
                warn!(state = ?*state, "Service already started");
                return;
            }
            *state = ServiceState::Starting;
        }

        info!("Starting exchange-rate service");
        let mut starting = StartGuard::new(&self.state);
        let handle = self.scheduler.clone().start().await;
        starting.disarm();

        let cancelled = {
            let mut state = self.state.write();
            if *state == ServiceState::Starting {
                *self.refresh.lock() = Some(handle);
                *state = ServiceState::Running;
                None
            } else {
                Some(handle)
            }
        };

        match cancelled {
            None => info!(rates = self.store.len(), "Exchange-rate service started"),
            Some(handle) => {
                handle.shutdown().await;
                *self.state.write() = ServiceState::Stopped;
                info!("Exchange-rate service stopped during startup");
            }
        }
    }

    /// Cancel the refresh timer. Only the first call has any effect.
    ///
    /// During startup this records the stop; the timer is cancelled by
    /// `start` right after the initial fetch completes.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        {
            let mut state = self.state.write();
            match *state {
                ServiceState::Running => *state = ServiceState::ShuttingDown,
                ServiceState::Starting => {
                    *state = ServiceState::ShuttingDown;
                    info!("Shutdown requested while the initial fetch is in flight");
                    return;
                }
                _ => return,
            }
        }

        let handle = self.refresh.lock().take();
        if let Some(handle) = handle {
            handle.shutdown().await;
        }

        *self.state.write() = ServiceState::Stopped;
        info!("Exchange-rate service stopped");
    }

    pub fn state(&self) -> ServiceState {
        *self.state.read()
    }

    pub fn config(&self) -> &FxConfig {
        &self.config
    }

    pub fn store(&self) -> &SharedRateStore {
        &self.store
    }

    pub fn engine(&self) -> &Arc<ConversionEngine> {
        &self.engine
    }

    pub fn formatter(&self) -> &CurrencyFormatter {
        &self.formatter
    }

    /// Subscribe to notices.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.notifier.subscribe()
    }

    /// Check if any refresh is in flight.
    pub fn is_loading(&self) -> bool {
        self.scheduler.is_loading()
    }

    /// Current rates in source order.
    pub fn rates(&self) -> Vec<ExchangeRate> {
        self.store.rates()
    }

    pub fn get_rate(&self, code: &CurrencyCode) -> Option<ExchangeRate> {
        self.store.get_rate(code)
    }

    /// Manual refresh.
    pub async fn refresh_now(&self) -> FxResult<usize> {
        self.scheduler.refresh_now().await
    }

    pub async fn convert(&self, amount: f64, from: &CurrencyCode, to: &CurrencyCode) -> Conversion {
        self.engine.convert(amount, from, to).await
    }

    pub async fn convert_all(&self, amount: f64, from: &CurrencyCode) -> Vec<BatchEntry> {
        self.engine.convert_all(amount, from).await
    }

    /// Format in `code`, or the display currency.
    pub fn format(&self, amount: f64, code: Option<&str>) -> String {
        self.formatter.format(amount, code)
    }

    pub fn display_currency(&self) -> String {
        self.formatter.display_currency()
    }

    /// Converter bound to this service's engine.
    pub fn converter(&self) -> Converter {
        Converter::new(self.engine.clone())
    }

    /// Fresh converter form for the current display currency and rates.
    pub fn converter_form(&self) -> ConverterForm {
        ConverterForm::new(&self.display_currency(), self.store.snapshot().rates())
    }

    /// Rates table for `amount` in `source`.
    pub async fn rates_table(&self, source: CurrencyCode, amount: f64) -> RatesTable {
        RatesTable::load(&self.engine, source, amount).await
    }
}

/// Resets the lifecycle state if `start` is dropped before the timer is armed.
struct StartGuard<'a> {
    state: &'a RwLock<ServiceState>,
    armed: bool,
}

impl<'a> StartGuard<'a> {
    fn new(state: &'a RwLock<ServiceState>) -> Self {
        Self { state, armed: true }
    }

    fn disarm(&mut self) {
        self.armed = false;
    }
}

impl Drop for StartGuard<'_> {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let mut state = self.state.write();
        *state = match *state {
            ServiceState::Starting => ServiceState::Idle,
            ServiceState::ShuttingDown => ServiceState::Stopped,
            other => other,
        };
        warn!(state = ?*state, "Service start abandoned before the timer was armed");
    }
}
