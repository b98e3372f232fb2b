// ── Service domain types ──
//
// The torrent client and downloader attached to a host, plus the
// declared inventory they are assembled from.

use serde::{Deserialize, Deserializer, Serialize};
use strum::{Display, EnumString};

/// Torrent client run state.
///
/// `PausedByAutomation` is only ever set by the reconciliation engine and
/// is the only state automation resumes from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum TorrentStatus {
    Online,
    Paused,
    PausedByAutomation,
}

impl TorrentStatus {
    pub fn is_online(self) -> bool {
        matches!(self, Self::Online)
    }

    pub fn is_held_by_automation(self) -> bool {
        matches!(self, Self::PausedByAutomation)
    }
}

/// A qBittorrent instance running on a host.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TorrentClient {
    pub ip: String,
    pub vps_name: String,
    pub status: TorrentStatus,
    /// Current upload throughput, MB/s.
    #[serde(default, deserialize_with = "non_negative")]
    pub upload_rate: f64,
    /// Current download throughput, MB/s.
    #[serde(default, deserialize_with = "non_negative")]
    pub download_rate: f64,
    /// Bytes uploaded today.
    #[serde(default)]
    pub today_upload: u64,
    /// Bytes downloaded today.
    #[serde(default)]
    pub today_download: u64,
}

impl TorrentClient {
    /// Copy of this client with a different status.
    pub fn with_status(&self, status: TorrentStatus) -> Self {
        Self {
            status,
            ..self.clone()
        }
    }
}

/// A Vertex downloader bound to a host.
///
/// There is no "disabled by automation" marker: automation flips
/// `enabled` directly and a user may flip it back at any time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Downloader {
    pub ip: String,
    pub alias: String,
    pub id: String,
    pub enabled: bool,
}

impl Downloader {
    pub fn with_enabled(&self, enabled: bool) -> Self {
        Self {
            enabled,
            ..self.clone()
        }
    }
}

/// Services declared for the fleet, joined to hosts by IP.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Inventory {
    pub torrent_clients: Vec<TorrentClient>,
    pub downloaders: Vec<Downloader>,
}

impl Inventory {
    pub fn is_empty(&self) -> bool {
        self.torrent_clients.is_empty() && self.downloaders.is_empty()
    }
}

fn non_negative<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
    let value = f64::deserialize(deserializer)?;
    if value.is_finite() && value >= 0.0 {
        Ok(value)
    } else {
        Err(serde::de::Error::custom(format!(
            "throughput must be a non-negative number, got {value}"
        )))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn torrent_status_wire_names() {
        assert_eq!(
            serde_json::to_string(&TorrentStatus::PausedByAutomation).unwrap(),
            "\"PAUSED_BY_AUTOMATION\""
        );
        assert_eq!(TorrentStatus::Online.to_string(), "ONLINE");
        assert_eq!(
            "PAUSED".parse::<TorrentStatus>().unwrap(),
            TorrentStatus::Paused
        );
    }

    #[test]
    fn negative_rates_are_rejected() {
        let raw = r#"{"ip":"1.1.1.1","vpsName":"x","status":"ONLINE","uploadRate":-1.0}"#;
        assert!(serde_json::from_str::<TorrentClient>(raw).is_err());
    }

    #[test]
    fn missing_counters_default_to_zero() {
        let raw = r#"{"ip":"1.1.1.1","vpsName":"x","status":"PAUSED"}"#;
        let client: TorrentClient = serde_json::from_str(raw).unwrap();
        assert!(client.upload_rate.abs() < f64::EPSILON);
        assert_eq!(client.today_download, 0);
    }
}
