// ── User-editable settings ──
//
// The persisted settings bundle, the key-value backends it is stored in,
// and the store that owns it.

mod storage;
mod store;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

pub use storage::{FileStore, KeyValueStore, MemoryStore};
pub use store::{SETTINGS_KEY, SettingsStore};

/// Display value shown in place of every account password.
pub const MASKED_PASSWORD: &str = "•••";

/// Everything a user can change, persisted as one JSON blob.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub accounts: Vec<Account>,
    pub notifications: NotificationSettings,
    pub automation: AutomationConfig,
    pub integrations: IntegrationSettings,
}

// ── Accounts ─────────────────────────────────────────────────────────

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, Display, EnumString,
)]
pub enum AccountStatus {
    Active,
    #[default]
    Inactive,
}

/// A monitor account. The real password is never kept; only its mask.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: u32,
    pub login: String,
    #[serde(default = "masked")]
    pub password: String,
    #[serde(default)]
    pub status: AccountStatus,
}

fn masked() -> String {
    MASKED_PASSWORD.to_owned()
}

/// Next free account id: one more than the largest, or 1 when empty.
pub fn next_account_id(accounts: &[Account]) -> u32 {
    accounts
        .iter()
        .map(|a| a.id)
        .max()
        .map_or(1, |max| max.saturating_add(1))
}

// ── Notifications ────────────────────────────────────────────────────

/// Telegram alert target. Both fields empty means "not configured".
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct NotificationSettings {
    pub telegram_token: String,
    pub chat_id: String,
}

impl NotificationSettings {
    pub fn is_configured(&self) -> bool {
        !self.telegram_token.trim().is_empty() && !self.chat_id.trim().is_empty()
    }
}

// ── Automation ───────────────────────────────────────────────────────

/// What an automation check does when a host changes throttling state.
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum AutomationAction {
    /// Pause torrent clients and disable downloaders while throttled.
    #[default]
    Pause,
    /// Reserved for rate limiting; currently observes only.
    Limit,
    /// Leave services alone and alert.
    Notify,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AutomationConfig {
    /// Seconds between checks. Always positive.
    #[serde(rename = "interval", alias = "intervalSeconds")]
    pub interval_secs: u64,
    pub action: AutomationAction,
    pub enabled: bool,
}

impl Default for AutomationConfig {
    fn default() -> Self {
        Self {
            interval_secs: 300,
            action: AutomationAction::Pause,
            enabled: true,
        }
    }
}

impl AutomationConfig {
    pub fn interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.interval_secs)
    }
}

// ── Integrations ─────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct IntegrationSettings {
    pub qbit_user: String,
    pub qbit_pass: String,
    pub vertex_path: String,
    /// Base URL of the fleet status API.
    pub api_endpoint: String,
}

impl Default for IntegrationSettings {
    fn default() -> Self {
        Self {
            qbit_user: "admin".into(),
            qbit_pass: String::new(),
            vertex_path: "/etc/vertex/config.json".into(),
            api_endpoint: "http://localhost:8000/api".into(),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn account(id: u32) -> Account {
        Account {
            id,
            login: format!("user{id}"),
            password: masked(),
            status: AccountStatus::Inactive,
        }
    }

    #[test]
    fn first_account_id_is_one() {
        assert_eq!(next_account_id(&[]), 1);
    }

    #[test]
    fn next_id_skips_past_the_maximum() {
        assert_eq!(next_account_id(&[account(1), account(3)]), 4);
    }

    #[test]
    fn automation_wire_shape() {
        let json = serde_json::to_value(AutomationConfig::default()).unwrap();
        assert_eq!(
            json,
            serde_json::json!({"interval": 300, "action": "pause", "enabled": true})
        );

        let legacy: AutomationConfig =
            serde_json::from_str(r#"{"intervalSeconds": 60, "action": "notify"}"#).unwrap();
        assert_eq!(legacy.interval_secs, 60);
        assert_eq!(legacy.action, AutomationAction::Notify);
        assert!(legacy.enabled);
    }

    #[test]
    fn notification_target_requires_both_fields() {
        let mut n = NotificationSettings::default();
        assert!(!n.is_configured());
        n.telegram_token = "123:abc".into();
        assert!(!n.is_configured());
        n.chat_id = "42".into();
        assert!(n.is_configured());
    }
}
