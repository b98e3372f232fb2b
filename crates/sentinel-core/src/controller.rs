// ── Sentinel facade ──
//
// Wires the fleet store, status source, settings, notification surface
// and activity log together. Owns no timers: the scheduler drives
// `run_automation_check` from outside.

use std::fmt::Write as _;
use std::sync::Arc;

use serde::Serialize;
use tracing::{debug, info, warn};

use sentinel_api::TelegramClient;

use crate::activity::{ActivityLog, ActivitySource};
use crate::error::CoreError;
use crate::model::{Host, Inventory, TorrentStatus, assemble_hosts};
use crate::notify::Notifier;
use crate::poller::{PollKind, StatusSource};
use crate::settings::{AutomationAction, SettingsStore};
use crate::store::reconcile::{reconcile, refresh_monitors, transitions};
use crate::store::{FleetStore, Transition, TransitionKind};

// ── Outcomes ─────────────────────────────────────────────────────────

/// New state of a service after a successful manual toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "service", rename_all = "camelCase")]
pub enum ToggledState {
    TorrentClient { status: TorrentStatus },
    Downloader { enabled: bool },
}

/// Result of a manual toggle. Only `Applied` changed anything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum ToggleOutcome {
    Applied(ToggledState),
    /// The torrent client is held by automation and cannot be toggled.
    Rejected,
    /// The host exists but does not run this service.
    NoService,
    UnknownHost,
}

impl ToggleOutcome {
    pub fn is_applied(self) -> bool {
        matches!(self, Self::Applied(_))
    }
}

/// What one automation check observed and did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckReport {
    pub action: AutomationAction,
    /// Hosts present in the poll result.
    pub polled: usize,
    pub transitions: Vec<Transition>,
}

// ── Sentinel ─────────────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable; all clones share the same stores.
#[derive(Clone)]
pub struct Sentinel {
    inner: Arc<SentinelInner>,
}

struct SentinelInner {
    fleet: FleetStore,
    settings: SettingsStore,
    notifier: Notifier,
    activity: ActivityLog,
    source: Arc<dyn StatusSource>,
    telegram: Option<TelegramClient>,
}

/// Assembles a [`Sentinel`] from its collaborators.
pub struct SentinelBuilder {
    source: Arc<dyn StatusSource>,
    settings: SettingsStore,
    notifier: Notifier,
    fleet: Option<FleetStore>,
    activity: Option<ActivityLog>,
    telegram: Option<TelegramClient>,
}

impl SentinelBuilder {
    #[must_use]
    pub fn fleet(mut self, fleet: FleetStore) -> Self {
        self.fleet = Some(fleet);
        self
    }

    #[must_use]
    pub fn activity(mut self, activity: ActivityLog) -> Self {
        self.activity = Some(activity);
        self
    }

    #[must_use]
    pub fn telegram(mut self, telegram: TelegramClient) -> Self {
        self.telegram = Some(telegram);
        self
    }

    pub fn build(self) -> Sentinel {
        Sentinel {
            inner: Arc::new(SentinelInner {
                fleet: self.fleet.unwrap_or_default(),
                settings: self.settings,
                notifier: self.notifier,
                activity: self.activity.unwrap_or_default(),
                source: self.source,
                telegram: self.telegram,
            }),
        }
    }
}

impl Sentinel {
    pub fn builder(
        source: Arc<dyn StatusSource>,
        settings: SettingsStore,
        notifier: Notifier,
    ) -> SentinelBuilder {
        SentinelBuilder {
            source,
            settings,
            notifier,
            fleet: None,
            activity: None,
            telegram: None,
        }
    }

    // ── Accessors ────────────────────────────────────────────────────

    pub fn fleet(&self) -> &FleetStore {
        &self.inner.fleet
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.inner.settings
    }

    pub fn notifier(&self) -> &Notifier {
        &self.inner.notifier
    }

    pub fn activity(&self) -> &ActivityLog {
        &self.inner.activity
    }

    pub fn source_description(&self) -> String {
        self.inner.source.describe()
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Build the fleet from a first poll joined with `inventory`.
    ///
    /// On failure the store is left as it was. Returns the host count.
    pub async fn initialize(&self, inventory: &Inventory) -> Result<usize, CoreError> {
        let monitors = match self.inner.source.fetch_status(PollKind::Initial).await {
            Ok(monitors) => monitors,
            Err(e) => {
                warn!(error = %e, "initial status poll failed");
                self.inner
                    .activity
                    .error(ActivitySource::Monitor, format!("Initial status poll failed: {e}"));
                return Err(e);
            }
        };

        let hosts = assemble_hosts(monitors, inventory);
        let count = hosts.len();
        self.inner.fleet.replace_all(hosts);

        info!(hosts = count, source = %self.inner.source.describe(), "fleet initialized");
        self.inner
            .activity
            .info(ActivitySource::System, format!("Fleet initialized with {count} hosts"));
        Ok(count)
    }

    // ── Automation ───────────────────────────────────────────────────

    /// Poll once and reconcile the result into the fleet.
    ///
    /// The result is applied to the fleet as it is when the poll returns,
    /// so toggles made while the poll was in flight are kept unless the
    /// same host changed throttling state. A failed poll leaves the
    /// fleet untouched.
    pub async fn run_automation_check(&self) -> Result<CheckReport, CoreError> {
        let action = self.inner.settings.automation().action;
        debug!(%action, "running automation check");

        let latest = match self.inner.source.fetch_status(PollKind::Automation).await {
            Ok(latest) => latest,
            Err(e) => {
                warn!(error = %e, "automation poll failed, keeping last known state");
                self.inner
                    .activity
                    .error(ActivitySource::Monitor, format!("Status poll failed: {e}"));
                return Err(e);
            }
        };

        let changes = self.inner.fleet.apply(|current| {
            let changes = transitions(current, &latest);
            let next = match action {
                AutomationAction::Pause => reconcile(current, &latest),
                AutomationAction::Limit | AutomationAction::Notify => {
                    refresh_monitors(current, &latest)
                }
            };
            (next, changes)
        });

        for change in &changes {
            self.record_transition(change, action);
        }

        match action {
            AutomationAction::Pause => {}
            AutomationAction::Limit => {
                if !changes.is_empty() {
                    warn!(
                        transitions = changes.len(),
                        "limit action is not implemented, services left untouched"
                    );
                }
            }
            AutomationAction::Notify => self.alert(&changes).await,
        }

        Ok(CheckReport {
            action,
            polled: latest.len(),
            transitions: changes,
        })
    }

    fn record_transition(&self, change: &Transition, action: AutomationAction) {
        let activity = &self.inner.activity;
        match change.kind {
            TransitionKind::Throttled => {
                info!(host = %change.ip, name = %change.name, %action, "host throttled");
                activity.warn(ActivitySource::Monitor, format!("{} is now throttled", change.name));
                if action == AutomationAction::Pause {
                    activity.info(
                        ActivitySource::TorrentClient,
                        format!("Paused torrent client on {} (throttled)", change.name),
                    );
                    activity.info(
                        ActivitySource::Downloader,
                        format!("Disabled downloader on {} (throttled)", change.name),
                    );
                }
            }
            TransitionKind::Recovered => {
                info!(host = %change.ip, name = %change.name, %action, "host recovered");
                activity.info(ActivitySource::Monitor, format!("{} is healthy again", change.name));
                if action == AutomationAction::Pause {
                    activity.info(
                        ActivitySource::TorrentClient,
                        format!("Restored services on {}", change.name),
                    );
                }
            }
        }
    }

    /// Surface transitions on the notifier and, when configured, Telegram.
    async fn alert(&self, changes: &[Transition]) {
        if changes.is_empty() {
            return;
        }

        let mut text = String::from("Fleet Sentinel:");
        for change in changes {
            let verb = match change.kind {
                TransitionKind::Throttled => "throttled",
                TransitionKind::Recovered => "healthy again",
            };
            let _ = write!(text, "\n{} ({}) is {verb}", change.name, change.ip);
        }
        self.inner.notifier.info(text.clone());

        let target = self.inner.settings.notifications();
        if !target.is_configured() {
            debug!("telegram target not configured, alert shown locally only");
            return;
        }
        if let Err(e) = self.send_telegram(&target.telegram_token, &target.chat_id, &text).await {
            warn!(error = %e, "telegram alert failed");
            self.inner
                .activity
                .error(ActivitySource::System, format!("Telegram alert failed: {e}"));
        }
    }

    async fn send_telegram(&self, token: &str, chat_id: &str, text: &str) -> Result<(), CoreError> {
        let Some(telegram) = self.inner.telegram.as_ref() else {
            return Err(CoreError::Notification {
                message: "Telegram client is not available".into(),
            });
        };
        telegram
            .send_message(token, chat_id, text)
            .await
            .map_err(|e| CoreError::notification(&e))
    }

    // ── Manual toggles ───────────────────────────────────────────────

    /// Flip a torrent client between `Online` and `Paused`.
    ///
    /// A client held by automation is left alone and `Rejected` returned.
    pub fn toggle_torrent_client(&self, ip: &str) -> ToggleOutcome {
        let outcome = self
            .inner
            .fleet
            .modify_host(ip, |host| {
                let Some(client) = host.torrent_client.as_ref() else {
                    return (None, ToggleOutcome::NoService);
                };
                let status = match client.status {
                    TorrentStatus::PausedByAutomation => return (None, ToggleOutcome::Rejected),
                    TorrentStatus::Online => TorrentStatus::Paused,
                    TorrentStatus::Paused => TorrentStatus::Online,
                };
                let next = Host {
                    torrent_client: Some(client.with_status(status)),
                    ..host.clone()
                };
                (
                    Some(next),
                    ToggleOutcome::Applied(ToggledState::TorrentClient { status }),
                )
            })
            .unwrap_or(ToggleOutcome::UnknownHost);

        match outcome {
            ToggleOutcome::Applied(ToggledState::TorrentClient { status }) => {
                info!(host = %ip, %status, "torrent client toggled");
                self.inner
                    .activity
                    .info(ActivitySource::TorrentClient, format!("{ip}: torrent client set to {status}"));
            }
            ToggleOutcome::Rejected => {
                debug!(host = %ip, "toggle refused, client held by automation");
                self.inner.activity.warn(
                    ActivitySource::TorrentClient,
                    format!("{ip}: torrent client is paused by automation"),
                );
            }
            _ => debug!(host = %ip, ?outcome, "torrent toggle had no effect"),
        }
        outcome
    }

    /// Flip a downloader's `enabled` flag, throttled or not.
    pub fn toggle_downloader(&self, ip: &str) -> ToggleOutcome {
        let outcome = self
            .inner
            .fleet
            .modify_host(ip, |host| {
                let Some(downloader) = host.downloader.as_ref() else {
                    return (None, ToggleOutcome::NoService);
                };
                let enabled = !downloader.enabled;
                let next = Host {
                    downloader: Some(downloader.with_enabled(enabled)),
                    ..host.clone()
                };
                (
                    Some(next),
                    ToggleOutcome::Applied(ToggledState::Downloader { enabled }),
                )
            })
            .unwrap_or(ToggleOutcome::UnknownHost);

        if let ToggleOutcome::Applied(ToggledState::Downloader { enabled }) = outcome {
            let verb = if enabled { "enabled" } else { "disabled" };
            info!(host = %ip, enabled, "downloader toggled");
            self.inner
                .activity
                .info(ActivitySource::Downloader, format!("{ip}: downloader {verb}"));
        } else {
            debug!(host = %ip, ?outcome, "downloader toggle had no effect");
        }
        outcome
    }

    // ── Notifications ────────────────────────────────────────────────

    /// Send a test message to the configured Telegram chat.
    ///
    /// The outcome is also shown on the notification surface.
    pub async fn test_notification(&self) -> Result<(), CoreError> {
        let target = self.inner.settings.notifications();
        if !target.is_configured() {
            let err = CoreError::validation("notifications", "Telegram token and chat id are required");
            self.inner.notifier.error(err.to_string());
            return Err(err);
        }

        let result = self
            .send_telegram(
                target.telegram_token.trim(),
                target.chat_id.trim(),
                "Fleet Sentinel test notification",
            )
            .await;

        match &result {
            Ok(()) => {
                info!("test notification delivered");
                self.inner.notifier.success("Test notification sent");
            }
            Err(e) => {
                warn!(error = %e, "test notification failed");
                self.inner.notifier.error(e.to_string());
            }
        }
        result
    }
}
