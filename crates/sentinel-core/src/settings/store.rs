// ── Settings store ──
//
// Sole writer of the settings bundle. Loads once from a key-value
// backend, then persists on a debounce after every effective change.

use std::sync::{Arc, Weak};
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, info, warn};

use super::storage::KeyValueStore;
use super::{
    Account, AccountStatus, AutomationConfig, IntegrationSettings, MASKED_PASSWORD,
    NotificationSettings, Settings, next_account_id,
};
use crate::error::CoreError;
use crate::notify::Notifier;
use crate::observable::{Observable, Subscription};
use crate::stream::SnapshotStream;
use crate::timer::TimerSlot;

/// Storage key of the settings blob.
pub const SETTINGS_KEY: &str = "netcup-sentinel-settings";

/// Quiet period after the last change before the bundle is written.
pub const DEFAULT_AUTOSAVE_DEBOUNCE: Duration = Duration::from_millis(500);

/// Handle to the settings bundle. Clones share state.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<Inner>,
}

struct Inner {
    settings: Observable<Settings>,
    backend: Arc<dyn KeyValueStore>,
    notifier: Notifier,
    autosave: TimerSlot,
    debounce: Duration,
}

impl SettingsStore {
    /// Build a store, loading whatever the backend holds.
    ///
    /// Never fails: unreadable or corrupt entries yield defaults for the
    /// affected fields and a warning in the log.
    pub fn load(backend: Arc<dyn KeyValueStore>, notifier: Notifier) -> Self {
        Self::load_with_debounce(backend, notifier, DEFAULT_AUTOSAVE_DEBOUNCE)
    }

    pub fn load_with_debounce(
        backend: Arc<dyn KeyValueStore>,
        notifier: Notifier,
        debounce: Duration,
    ) -> Self {
        let settings = match backend.get(SETTINGS_KEY) {
            Ok(Some(raw)) => parse_settings(&raw),
            Ok(None) => {
                debug!("no saved settings, using defaults");
                Settings::default()
            }
            Err(e) => {
                warn!(error = %e, "failed to read settings, using defaults");
                Settings::default()
            }
        };

        Self {
            inner: Arc::new(Inner {
                settings: Observable::new(settings),
                backend,
                notifier,
                autosave: TimerSlot::new("settings-autosave"),
                debounce,
            }),
        }
    }

    // ── Readers ──────────────────────────────────────────────────────

    pub fn snapshot(&self) -> Settings {
        self.inner.settings.get()
    }

    pub fn accounts(&self) -> Vec<Account> {
        self.inner.settings.with(|s| s.accounts.clone())
    }

    pub fn notifications(&self) -> NotificationSettings {
        self.inner.settings.with(|s| s.notifications.clone())
    }

    pub fn automation(&self) -> AutomationConfig {
        self.inner.settings.with(|s| s.automation.clone())
    }

    pub fn integrations(&self) -> IntegrationSettings {
        self.inner.settings.with(|s| s.integrations.clone())
    }

    pub fn subscribe(&self) -> SnapshotStream<Settings> {
        SnapshotStream::new(self.inner.settings.watch())
    }

    pub fn on_change(&self, callback: impl Fn(&Settings) + Send + Sync + 'static) -> Subscription {
        self.inner.settings.subscribe(callback)
    }

    /// Whether a debounced write is waiting to fire.
    pub fn has_pending_save(&self) -> bool {
        self.inner.autosave.is_armed()
    }

    // ── Accounts ─────────────────────────────────────────────────────

    /// Append a new inactive account with the next free id.
    pub fn add_account(&self, login: &str, password: &str) -> Result<Account, CoreError> {
        let login = login.trim();
        if login.is_empty() || password.trim().is_empty() {
            return Err(CoreError::validation(
                "account",
                "login and password are required",
            ));
        }

        let account = self.mutate(|s| {
            let account = Account {
                id: next_account_id(&s.accounts),
                login: login.to_owned(),
                password: MASKED_PASSWORD.to_owned(),
                status: AccountStatus::Inactive,
            };
            let mut next = s.clone();
            next.accounts.push(account.clone());
            (Some(next), account)
        });
        info!(id = account.id, login = %account.login, "account added");
        Ok(account)
    }

    /// Remove an account. Returns `false` if no account had this id.
    pub fn remove_account(&self, id: u32) -> bool {
        self.mutate(|s| {
            if !s.accounts.iter().any(|a| a.id == id) {
                return (None, false);
            }
            let mut next = s.clone();
            next.accounts.retain(|a| a.id != id);
            (Some(next), true)
        })
    }

    pub fn set_account_status(&self, id: u32, status: AccountStatus) -> bool {
        self.mutate(|s| {
            let Some(idx) = s.accounts.iter().position(|a| a.id == id) else {
                return (None, false);
            };
            if s.accounts[idx].status == status {
                return (None, true);
            }
            let mut next = s.clone();
            next.accounts[idx].status = status;
            (Some(next), true)
        })
    }

    // ── Sections ─────────────────────────────────────────────────────

    pub fn update_notifications(&self, notifications: NotificationSettings) {
        self.replace_section(|s| &mut s.notifications, notifications);
    }

    /// Replace the automation config. A zero interval is refused.
    pub fn set_automation(&self, automation: AutomationConfig) -> Result<(), CoreError> {
        if automation.interval_secs == 0 {
            return Err(CoreError::validation(
                "interval",
                "must be at least one second",
            ));
        }
        self.replace_section(|s| &mut s.automation, automation);
        Ok(())
    }

    pub fn update_integrations(&self, integrations: IntegrationSettings) {
        self.replace_section(|s| &mut s.integrations, integrations);
    }

    // ── Persistence ──────────────────────────────────────────────────

    /// Write the bundle now, cancelling any pending autosave.
    ///
    /// A failure is logged and shown on the notification surface; the
    /// in-memory settings stay authoritative either way.
    pub fn save(&self) -> Result<(), CoreError> {
        self.inner.autosave.cancel();
        self.inner.write()
    }

    /// Write only if an autosave is pending. Used on shutdown.
    ///
    /// An autosave whose debounce already elapsed is not pending: its write
    /// is under way and is not repeated here.
    pub fn flush(&self) -> Result<(), CoreError> {
        if self.inner.autosave.cancel() {
            self.inner.write()
        } else {
            Ok(())
        }
    }

    // ── Internals ────────────────────────────────────────────────────

    fn replace_section<T: PartialEq>(&self, field: impl Fn(&mut Settings) -> &mut T, value: T) {
        self.mutate(|s| {
            let mut next = s.clone();
            let slot = field(&mut next);
            if *slot == value {
                return (None, ());
            }
            *slot = value;
            (Some(next), ())
        });
    }

    /// Apply a change and arm the autosave if anything changed.
    fn mutate<R>(&self, f: impl FnOnce(&Settings) -> (Option<Settings>, R)) -> R {
        let before = self.inner.settings.version();
        let result = self.inner.settings.modify(f);
        if self.inner.settings.version() != before {
            self.schedule_save();
        }
        result
    }

    fn schedule_save(&self) {
        let weak: Weak<Inner> = Arc::downgrade(&self.inner);
        self.inner.autosave.arm_once(self.inner.debounce, move || async move {
            let Some(inner) = weak.upgrade() else { return };
            // Failures are already logged and surfaced.
            let _ = tokio::task::spawn_blocking(move || inner.write()).await;
        });
    }
}

impl Inner {
    fn write(&self) -> Result<(), CoreError> {
        let result = self
            .settings
            .with(serde_json::to_string)
            .map_err(CoreError::persistence)
            .and_then(|raw| self.backend.set(SETTINGS_KEY, &raw));

        match &result {
            Ok(()) => debug!("settings persisted"),
            Err(e) => {
                warn!(error = %e, "failed to save settings");
                self.notifier.error(format!("Failed to save settings: {e}"));
            }
        }
        result
    }
}

// ── Loading ──────────────────────────────────────────────────────────

/// Parse a stored blob. Anything missing or malformed falls back to its
/// default field by field; the rest of the blob is kept.
fn parse_settings(raw: &str) -> Settings {
    let value: Value = match serde_json::from_str(raw) {
        Ok(Value::Object(map)) => Value::Object(map),
        Ok(_) => {
            warn!("saved settings are not an object, using defaults");
            return Settings::default();
        }
        Err(e) => {
            warn!(error = %e, "saved settings are corrupt, using defaults");
            return Settings::default();
        }
    };

    let mut automation: AutomationConfig = section(&value, "automation");
    if automation.interval_secs == 0 {
        warn!("saved automation interval is zero, using the default interval");
        automation.interval_secs = AutomationConfig::default().interval_secs;
    }

    Settings {
        accounts: accounts(&value),
        notifications: section(&value, "notifications"),
        automation,
        integrations: section(&value, "integrations"),
    }
}

/// Decode one section, keeping every field that decodes on its own.
///
/// `T` must default its missing fields (`#[serde(default)]`), so the
/// accepted subset of the stored object is always a valid `T`.
fn section<T: DeserializeOwned + Default>(value: &Value, key: &str) -> T {
    let stored = match value.get(key) {
        None | Some(Value::Null) => return T::default(),
        Some(Value::Object(stored)) => stored,
        Some(_) => {
            warn!(section = key, "settings section is not an object, using defaults");
            return T::default();
        }
    };

    let mut accepted = Map::new();
    for (field, raw) in stored {
        let mut candidate = accepted.clone();
        candidate.insert(field.clone(), raw.clone());
        match serde_json::from_value::<T>(Value::Object(candidate.clone())) {
            Ok(_) => accepted = candidate,
            Err(e) => warn!(section = key, field = %field, error = %e, "invalid settings field, using default"),
        }
    }

    serde_json::from_value(Value::Object(accepted)).unwrap_or_default()
}

/// Decode the account list, dropping entries that do not parse.
fn accounts(value: &Value) -> Vec<Account> {
    match value.get("accounts") {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Array(entries)) => entries
            .iter()
            .filter_map(|entry| {
                serde_json::from_value(entry.clone())
                    .inspect_err(|e| warn!(error = %e, "invalid saved account dropped"))
                    .ok()
            })
            .collect(),
        Some(_) => {
            warn!("saved accounts are not a list, using defaults");
            Vec::new()
        }
    }
}
