// Simulated status source for demos and tests.

use std::time::Duration;

use chrono::Utc;
use futures_util::FutureExt as _;
use futures_util::future::BoxFuture;
use tracing::debug;

use super::{PollKind, StatusSource};
use crate::error::CoreError;
use crate::model::{Downloader, Inventory, ThrottleMonitor, ThrottleStatus, TorrentClient, TorrentStatus};

/// The host whose status the coin flip controls.
pub const FLAPPING_HOST: &str = "192.168.1.102";

const HOSTS: [(&str, &str); 3] = [
    ("192.168.1.101", "VPS-DE-01"),
    (FLAPPING_HOST, "VPS-DE-02"),
    ("192.168.2.55", "VPS-FIN-01"),
];

/// Spacing of the synthetic `last_check` timestamps between hosts.
const CHECK_SPACING_SECS: i64 = 15;

type Coin = Box<dyn Fn() -> bool + Send + Sync>;

/// Three fixed hosts behind an artificial latency.
///
/// On automation polls a coin decides whether [`FLAPPING_HOST`] reports
/// throttled; the initial poll always reports the whole fleet healthy.
pub struct SimulatedStatusSource {
    latency: Duration,
    coin: Coin,
}

impl Default for SimulatedStatusSource {
    fn default() -> Self {
        Self::new(Duration::from_millis(250))
    }
}

impl SimulatedStatusSource {
    pub fn new(latency: Duration) -> Self {
        Self {
            latency,
            coin: Box::new(|| rand::random_bool(0.5)),
        }
    }

    /// Replace the random coin, e.g. with a fixed answer in tests.
    #[must_use]
    pub fn with_coin(mut self, coin: impl Fn() -> bool + Send + Sync + 'static) -> Self {
        self.coin = Box::new(coin);
        self
    }

    fn snapshot(&self, kind: PollKind) -> Vec<ThrottleMonitor> {
        let flapping_throttled = kind == PollKind::Automation && (self.coin)();
        let now = Utc::now();

        let mut monitors: Vec<ThrottleMonitor> = HOSTS
            .iter()
            .zip(0_i64..)
            .map(|(&(ip, name), idx)| ThrottleMonitor {
                ip: ip.to_owned(),
                name: name.to_owned(),
                status: ThrottleStatus::from_throttled(ip == FLAPPING_HOST && flapping_throttled),
                last_check: now - chrono::Duration::seconds(idx * CHECK_SPACING_SECS),
            })
            .collect();
        monitors.sort_by(|a, b| a.name.cmp(&b.name));
        monitors
    }
}

impl StatusSource for SimulatedStatusSource {
    fn fetch_status(&self, kind: PollKind) -> BoxFuture<'_, Result<Vec<ThrottleMonitor>, CoreError>> {
        async move {
            tokio::time::sleep(self.latency).await;
            let monitors = self.snapshot(kind);
            debug!(?kind, hosts = monitors.len(), "simulated status produced");
            Ok(monitors)
        }
        .boxed()
    }

    fn describe(&self) -> String {
        format!("simulated ({} ms latency)", self.latency.as_millis())
    }
}

const GB: u64 = 1_000_000_000;

/// Services matching the simulated fleet, plus one torrent client and
/// one downloader on hosts no monitor knows about.
pub fn demo_inventory() -> Inventory {
    let client = |ip: &str, name: &str, up: f64, down: f64, today_up: u64, today_down: u64| TorrentClient {
        ip: ip.into(),
        vps_name: name.into(),
        status: TorrentStatus::Online,
        upload_rate: up,
        download_rate: down,
        today_upload: today_up,
        today_download: today_down,
    };
    let downloader = |ip: &str, alias: &str, id: &str| Downloader {
        ip: ip.into(),
        alias: alias.into(),
        id: id.into(),
        enabled: true,
    };

    Inventory {
        torrent_clients: vec![
            client("192.168.1.101", "VPS-DE-01", 50.3, 12.1, 250 * GB, 80 * GB),
            client(FLAPPING_HOST, "VPS-DE-02", 0.0, 0.0, 1_200 * GB, 300 * GB),
            client("192.168.2.55", "VPS-FIN-01", 75.5, 22.1, 310 * GB, 95 * GB),
            client("10.0.0.5", "Non-Netcup-Seedbox", 150.0, 45.0, 500 * GB, 150 * GB),
        ],
        downloaders: vec![
            downloader("192.168.1.101", "VPS-DE-01", "vtx-001"),
            downloader(FLAPPING_HOST, "VPS-DE-02", "vtx-002"),
            downloader("10.0.0.8", "Non-Netcup-Downloader", "vtx-003"),
        ],
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::assemble_hosts;

    #[tokio::test(start_paused = true)]
    async fn initial_poll_is_always_healthy() {
        let source = SimulatedStatusSource::default().with_coin(|| true);
        let monitors = source.fetch_status(PollKind::Initial).await.unwrap();

        assert_eq!(monitors.len(), 3);
        assert!(monitors.iter().all(|m| !m.is_throttled()));
        let names: Vec<&str> = monitors.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, ["VPS-DE-01", "VPS-DE-02", "VPS-FIN-01"]);
    }

    #[tokio::test(start_paused = true)]
    async fn coin_controls_the_flapping_host() {
        let source = SimulatedStatusSource::default().with_coin(|| true);
        let monitors = source.fetch_status(PollKind::Automation).await.unwrap();

        let throttled: Vec<&str> = monitors
            .iter()
            .filter(|m| m.is_throttled())
            .map(|m| m.ip.as_str())
            .collect();
        assert_eq!(throttled, [FLAPPING_HOST]);
    }

    #[tokio::test(start_paused = true)]
    async fn latency_is_applied() {
        let source = SimulatedStatusSource::new(Duration::from_millis(250));
        let started = tokio::time::Instant::now();
        source.fetch_status(PollKind::Initial).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(250));
    }

    #[test]
    fn demo_orphans_are_not_managed() {
        let monitors = SimulatedStatusSource::default().snapshot(PollKind::Initial);
        let hosts = assemble_hosts(monitors, &demo_inventory());

        assert_eq!(hosts.len(), 3);
        assert!(hosts.iter().all(|h| h.ip != "10.0.0.5" && h.ip != "10.0.0.8"));
        let fin = hosts.iter().find(|h| h.ip == "192.168.2.55").unwrap();
        assert!(fin.torrent_client.is_some());
        assert!(fin.downloader.is_none());
    }
}
