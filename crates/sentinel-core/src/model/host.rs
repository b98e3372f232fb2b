// ── Host domain types ──

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use super::service::{Downloader, TorrentClient};

/// Throttling state reported by the monitor.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
pub enum ThrottleStatus {
    Healthy,
    Throttled,
}

impl ThrottleStatus {
    pub fn is_throttled(self) -> bool {
        matches!(self, Self::Throttled)
    }

    pub fn from_throttled(throttled: bool) -> Self {
        if throttled {
            Self::Throttled
        } else {
            Self::Healthy
        }
    }
}

/// Latest throttling observation for one host.
///
/// This record is the single source of truth for automation decisions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThrottleMonitor {
    pub ip: String,
    pub name: String,
    pub status: ThrottleStatus,
    pub last_check: DateTime<Utc>,
}

impl ThrottleMonitor {
    pub fn new(ip: impl Into<String>, name: impl Into<String>, status: ThrottleStatus) -> Self {
        Self {
            ip: ip.into(),
            name: name.into(),
            status,
            last_check: Utc::now(),
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.status.is_throttled()
    }
}

/// A managed VPS and the services running on it.
///
/// `ip` is the primary key and never changes once the host is in the
/// fleet store. Not every host runs every service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Host {
    pub ip: String,
    pub name: String,
    pub throttle_monitor: ThrottleMonitor,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub torrent_client: Option<TorrentClient>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub downloader: Option<Downloader>,
}

impl Host {
    /// A host with only its monitor record; services are attached by
    /// [`assemble_hosts`](crate::model::assemble_hosts).
    pub fn from_monitor(monitor: ThrottleMonitor) -> Self {
        Self {
            ip: monitor.ip.clone(),
            name: monitor.name.clone(),
            throttle_monitor: monitor,
            torrent_client: None,
            downloader: None,
        }
    }

    pub fn is_throttled(&self) -> bool {
        self.throttle_monitor.is_throttled()
    }
}
