//! Application settings collaborator.
//!
//! Settings are owned by an external CRUD service. The rate subsystem only
//! reads the display currency from them and falls back to the base currency
//! when no settings have been loaded.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::currency::BASE_CURRENCY;

/// User-level application settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppSettings {
    /// Preferred display currency code.
    pub currency: String,
    /// UI theme.
    pub theme: String,
    /// UI language.
    pub language: String,
    /// Whether notices should be shown.
    pub notifications_enabled: bool,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self {
            currency: BASE_CURRENCY.to_string(),
            theme: "light".to_string(),
            language: "en".to_string(),
            notifications_enabled: true,
        }
    }
}

/// Read access to the current settings.
pub trait SettingsSource: Send + Sync {
    /// Current settings, or `None` when none are loaded.
    fn current(&self) -> Option<AppSettings>;

    /// Configured display currency, if any.
    fn display_currency(&self) -> Option<String> {
        self.current()
            .map(|s| s.currency)
            .filter(|c| !c.trim().is_empty())
    }
}

/// Settings held in memory and replaced when the collaborator reloads them.
#[derive(Debug, Default)]
pub struct SharedSettings {
    inner: RwLock<Option<AppSettings>>,
}

impl SharedSettings {
    /// Create an empty settings holder.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a holder with settings already loaded.
    pub fn with_settings(settings: AppSettings) -> Self {
        Self {
            inner: RwLock::new(Some(settings)),
        }
    }

    /// Replace the loaded settings.
    pub fn set(&self, settings: AppSettings) {
        *self.inner.write() = Some(settings);
    }

    /// Forget loaded settings (e.g. on logout).
    pub fn clear(&self) {
        *self.inner.write() = None;
    }
}

impl SettingsSource for SharedSettings {
    fn current(&self) -> Option<AppSettings> {
        self.inner.read().clone()
    }
}
