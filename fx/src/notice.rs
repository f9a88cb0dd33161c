//! Transient user notices published by the rate subsystem.

use expensegrove_common::{time, CurrencyCode, Timestamp};
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::debug;
use uuid::Uuid;

use crate::error::FxError;

/// What a notice is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoticeKind {
    /// A refresh failed; displayed rates may be stale.
    RatesStale,
    /// A manual refresh completed.
    RatesUpdated,
    /// A conversion fell back to locally held rates.
    ApproximateConversion,
}

/// Visual weight of a notice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeLevel {
    Info,
    Destructive,
}

/// A dismissible notice. Never blocks the operation that raised it.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notice {
    /// ID used by the UI to dismiss the notice.
    pub id: Uuid,
    pub kind: NoticeKind,
    pub level: NoticeLevel,
    pub title: String,
    pub description: String,
    /// Error code of the underlying failure, if any.
    pub error_code: Option<&'static str>,
    pub created_at: Timestamp,
}

impl Notice {
    fn new(
        kind: NoticeKind,
        level: NoticeLevel,
        title: impl Into<String>,
        description: impl Into<String>,
        error_code: Option<&'static str>,
    ) -> Self {
        Self {
            id: Uuid::now_v7(),
            kind,
            level,
            title: title.into(),
            description: description.into(),
            error_code,
            created_at: time::now(),
        }
    }

    pub fn rates_stale(error: &FxError) -> Self {
        Self::new(
            NoticeKind::RatesStale,
            NoticeLevel::Destructive,
            "Failed to load exchange rates",
            "Rates may be stale. Currency conversion features may not work correctly.",
            Some(error.error_code()),
        )
    }

    pub fn rates_updated(count: usize) -> Self {
        Self::new(
            NoticeKind::RatesUpdated,
            NoticeLevel::Info,
            "Exchange rates updated",
            format!("Latest currency exchange rates have been loaded ({count} currencies)."),
            None,
        )
    }

    pub fn approximate_conversion(from: &CurrencyCode, to: &CurrencyCode, error: &FxError) -> Self {
        Self::new(
            NoticeKind::ApproximateConversion,
            NoticeLevel::Destructive,
            "Currency conversion failed",
            format!("Using approximate conversion for {from} to {to}. Please try again later."),
            Some(error.error_code()),
        )
    }
}

/// Fan-out channel for notices.
///
/// Publishing never blocks and never fails: with no subscribers the notice is
/// dropped, and a lagging subscriber loses its oldest notices.
#[derive(Debug, Clone)]
pub struct Notifier {
    tx: broadcast::Sender<Notice>,
}

impl Notifier {
    /// Create a notifier buffering up to `capacity` notices per subscriber.
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Subscribe to notices published from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<Notice> {
        self.tx.subscribe()
    }

    /// Publish a notice. Returns the number of subscribers reached.
    pub fn publish(&self, notice: Notice) -> usize {
        debug!(kind = ?notice.kind, title = %notice.title, "Publishing notice");
        self.tx.send(notice).unwrap_or(0)
    }
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new(32)
    }
}
