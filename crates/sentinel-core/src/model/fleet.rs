// ── Fleet-level derivations ──
//
// Pure functions over whole host tables: assembly from monitor records
// plus inventory, and the dashboard totals.

use std::sync::Arc;

use serde::Serialize;

use super::host::{Host, ThrottleMonitor};
use super::service::Inventory;

/// Join monitor records with declared services by IP.
///
/// One host per monitor record, in monitor order. Services whose IP has
/// no monitor record are not managed and are dropped.
pub fn assemble_hosts(monitors: Vec<ThrottleMonitor>, inventory: &Inventory) -> Vec<Host> {
    monitors
        .into_iter()
        .map(|monitor| {
            let mut host = Host::from_monitor(monitor);
            host.torrent_client = inventory
                .torrent_clients
                .iter()
                .find(|c| c.ip == host.ip)
                .cloned();
            host.downloader = inventory
                .downloaders
                .iter()
                .find(|d| d.ip == host.ip)
                .cloned();
            host
        })
        .collect()
}

/// Aggregate numbers for the fleet overview.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FleetStats {
    pub total_hosts: usize,
    pub throttled_hosts: usize,
    /// Sum of upload rates of online torrent clients, MB/s.
    pub total_upload: f64,
    /// Sum of download rates of online torrent clients, MB/s.
    pub total_download: f64,
}

impl FleetStats {
    pub fn from_hosts(hosts: &[Arc<Host>]) -> Self {
        let online = hosts
            .iter()
            .filter_map(|h| h.torrent_client.as_ref())
            .filter(|c| c.status.is_online());

        let (total_upload, total_download) = online.fold((0.0, 0.0), |(up, down), c| {
            (up + c.upload_rate, down + c.download_rate)
        });

        Self {
            total_hosts: hosts.len(),
            throttled_hosts: hosts.iter().filter(|h| h.is_throttled()).count(),
            total_upload,
            total_download,
        }
    }
}
