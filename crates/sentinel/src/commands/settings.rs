//! `sentinel settings show` and the masking shared by settings views.

use sentinel_core::{
    AutomationConfig, IntegrationSettings, MASKED_PASSWORD, NotificationSettings, Settings,
    SettingsStore,
};

use crate::cli::{GlobalOpts, SettingsArgs, SettingsCommand};
use crate::context;
use crate::error::CliError;
use crate::output;

/// Open the persisted settings for a command that only touches them.
pub fn open(global: &GlobalOpts) -> Result<SettingsStore, CliError> {
    let config = context::load_config(global)?;
    let (settings, _notifier) = context::open_settings(global, &config);
    Ok(settings)
}

/// Replace a non-empty secret with the mask.
pub fn mask(secret: &str) -> String {
    if secret.is_empty() {
        String::new()
    } else {
        MASKED_PASSWORD.to_owned()
    }
}

pub fn masked_integrations(i: &IntegrationSettings) -> IntegrationSettings {
    IntegrationSettings {
        qbit_pass: mask(&i.qbit_pass),
        ..i.clone()
    }
}

pub fn masked_notifications(n: &NotificationSettings) -> NotificationSettings {
    NotificationSettings {
        telegram_token: mask(&n.telegram_token),
        ..n.clone()
    }
}

pub fn automation_pairs(a: &AutomationConfig) -> Vec<(&'static str, String)> {
    vec![
        ("Enabled", a.enabled.to_string()),
        ("Interval", output::age(a.interval())),
        ("Action", a.action.to_string()),
    ]
}

pub fn integration_pairs(i: &IntegrationSettings) -> Vec<(&'static str, String)> {
    vec![
        ("qBittorrent user", i.qbit_user.clone()),
        ("qBittorrent pass", mask(&i.qbit_pass)),
        ("Vertex config", i.vertex_path.clone()),
        ("API endpoint", i.api_endpoint.clone()),
    ]
}

pub fn notification_pairs(n: &NotificationSettings) -> Vec<(&'static str, String)> {
    let or_unset = |v: String| if v.is_empty() { "(unset)".to_owned() } else { v };
    vec![
        ("Telegram token", or_unset(mask(&n.telegram_token))),
        ("Chat id", or_unset(n.chat_id.clone())),
    ]
}

fn settings_detail(s: &Settings) -> String {
    let active = s
        .accounts
        .iter()
        .filter(|a| a.status == sentinel_core::AccountStatus::Active)
        .count();
    let mut pairs = vec![("Accounts", format!("{} ({active} active)", s.accounts.len()))];
    pairs.extend(automation_pairs(&s.automation));
    pairs.extend(notification_pairs(&s.notifications));
    pairs.extend(integration_pairs(&s.integrations));
    output::detail(&pairs)
}

pub fn handle(args: &SettingsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let settings = open(global)?;
    match args.command {
        SettingsCommand::Show => {
            let mut snapshot = settings.snapshot();
            snapshot.integrations = masked_integrations(&snapshot.integrations);
            snapshot.notifications = masked_notifications(&snapshot.notifications);
            let out = output::render_single(global.output, &snapshot, settings_detail, |_| {
                sentinel_core::SETTINGS_KEY.to_owned()
            })?;
            output::print_output(&out, global.quiet);
            Ok(())
        }
    }
}
