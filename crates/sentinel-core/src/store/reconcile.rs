// ── Reconciliation engine ──
//
// Pure policy functions comparing the current host table with a fresh
// batch of monitor records. Nothing here touches a store: the caller
// decides where the result goes.

use std::collections::HashMap;
use std::sync::Arc;

use serde::Serialize;

use crate::model::{Host, ThrottleMonitor, TorrentStatus};

/// Direction of a throttling state change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TransitionKind {
    /// Healthy → Throttled.
    Throttled,
    /// Throttled → Healthy.
    Recovered,
}

/// A throttling state change detected for one host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Transition {
    pub ip: String,
    pub name: String,
    pub kind: TransitionKind,
}

/// Index the poll result by IP. The first record for an IP wins.
fn index(latest: &[ThrottleMonitor]) -> HashMap<&str, &ThrottleMonitor> {
    let mut map = HashMap::with_capacity(latest.len());
    for monitor in latest {
        map.entry(monitor.ip.as_str()).or_insert(monitor);
    }
    map
}

fn transition_of(host: &Host, latest: &ThrottleMonitor) -> Option<TransitionKind> {
    match (host.is_throttled(), latest.is_throttled()) {
        (false, true) => Some(TransitionKind::Throttled),
        (true, false) => Some(TransitionKind::Recovered),
        _ => None,
    }
}

/// Apply the pause policy to one host given its latest monitor record.
///
/// - Healthy → Throttled: the torrent client is held as
///   `PausedByAutomation` whatever its previous state, the downloader is
///   disabled.
/// - Throttled → Healthy: only a client held by automation is resumed; a
///   manual pause is left alone. The downloader is re-enabled.
/// - Otherwise only the monitor record is refreshed.
pub fn reconcile_host(host: &Host, latest: &ThrottleMonitor) -> Host {
    let mut next = Host {
        throttle_monitor: latest.clone(),
        ..host.clone()
    };

    match transition_of(host, latest) {
        Some(TransitionKind::Throttled) => {
            next.torrent_client = next
                .torrent_client
                .map(|c| c.with_status(TorrentStatus::PausedByAutomation));
            next.downloader = next.downloader.map(|d| d.with_enabled(false));
        }
        Some(TransitionKind::Recovered) => {
            next.torrent_client = next.torrent_client.map(|c| {
                if c.status.is_held_by_automation() {
                    c.with_status(TorrentStatus::Online)
                } else {
                    c
                }
            });
            next.downloader = next.downloader.map(|d| d.with_enabled(true));
        }
        None => {}
    }

    next
}

/// Reconcile a whole host table against a poll result.
///
/// Hosts absent from `latest` are passed through untouched (same `Arc`);
/// hosts in `latest` but not in the table are ignored.
pub fn reconcile(previous: &[Arc<Host>], latest: &[ThrottleMonitor]) -> Vec<Arc<Host>> {
    let latest = index(latest);
    previous
        .iter()
        .map(|host| match latest.get(host.ip.as_str()) {
            Some(monitor) => Arc::new(reconcile_host(host, monitor)),
            None => Arc::clone(host),
        })
        .collect()
}

/// Refresh monitor records without touching any service.
///
/// Used by automation actions that observe throttling but do not act on
/// services.
pub fn refresh_monitors(previous: &[Arc<Host>], latest: &[ThrottleMonitor]) -> Vec<Arc<Host>> {
    let latest = index(latest);
    previous
        .iter()
        .map(|host| match latest.get(host.ip.as_str()) {
            Some(monitor) => Arc::new(Host {
                throttle_monitor: (*monitor).clone(),
                ..(**host).clone()
            }),
            None => Arc::clone(host),
        })
        .collect()
}

/// List the throttling transitions `latest` implies for `previous`.
pub fn transitions(previous: &[Arc<Host>], latest: &[ThrottleMonitor]) -> Vec<Transition> {
    let latest = index(latest);
    previous
        .iter()
        .filter_map(|host| {
            let monitor = latest.get(host.ip.as_str())?;
            transition_of(host, monitor).map(|kind| Transition {
                ip: host.ip.clone(),
                name: host.name.clone(),
                kind,
            })
        })
        .collect()
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{Downloader, ThrottleStatus, TorrentClient};
    use pretty_assertions::assert_eq;

    fn host(ip: &str, status: ThrottleStatus, client: Option<TorrentStatus>, dl: Option<bool>) -> Arc<Host> {
        let mut h = Host::from_monitor(ThrottleMonitor::new(ip, format!("VPS-{ip}"), status));
        h.torrent_client = client.map(|status| TorrentClient {
            ip: ip.into(),
            vps_name: h.name.clone(),
            status,
            upload_rate: 1.0,
            download_rate: 1.0,
            today_upload: 0,
            today_download: 0,
        });
        h.downloader = dl.map(|enabled| Downloader {
            ip: ip.into(),
            alias: h.name.clone(),
            id: format!("vtx-{ip}"),
            enabled,
        });
        Arc::new(h)
    }

    fn status(ip: &str, status: ThrottleStatus) -> ThrottleMonitor {
        ThrottleMonitor::new(ip, format!("VPS-{ip}"), status)
    }

    fn client_status(h: &Host) -> TorrentStatus {
        h.torrent_client.as_ref().unwrap().status
    }

    fn downloader_enabled(h: &Host) -> bool {
        h.downloader.as_ref().unwrap().enabled
    }

    #[test]
    fn throttling_pauses_client_and_disables_downloader() {
        let before = vec![host("a", ThrottleStatus::Healthy, Some(TorrentStatus::Online), Some(true))];
        let after = reconcile(&before, &[status("a", ThrottleStatus::Throttled)]);

        assert_eq!(client_status(&after[0]), TorrentStatus::PausedByAutomation);
        assert!(!downloader_enabled(&after[0]));
        assert!(after[0].is_throttled());
    }

    #[test]
    fn throttling_overrides_a_manual_pause() {
        let before = vec![host("a", ThrottleStatus::Healthy, Some(TorrentStatus::Paused), None)];
        let after = reconcile(&before, &[status("a", ThrottleStatus::Throttled)]);

        assert_eq!(client_status(&after[0]), TorrentStatus::PausedByAutomation);
    }

    #[test]
    fn hosts_without_services_only_refresh_the_monitor() {
        let before = vec![host("a", ThrottleStatus::Healthy, None, None)];
        let after = reconcile(&before, &[status("a", ThrottleStatus::Throttled)]);

        assert!(after[0].torrent_client.is_none());
        assert!(after[0].downloader.is_none());
        assert!(after[0].is_throttled());
    }

    #[test]
    fn unchanged_status_is_idempotent() {
        let before = vec![host("a", ThrottleStatus::Healthy, Some(TorrentStatus::Online), Some(true))];
        let throttled = [status("a", ThrottleStatus::Throttled)];

        let once = reconcile(&before, &throttled);
        let twice = reconcile(&once, &throttled);

        assert_eq!(client_status(&twice[0]), client_status(&once[0]));
        assert_eq!(downloader_enabled(&twice[0]), downloader_enabled(&once[0]));
        assert!(transitions(&once, &throttled).is_empty());
    }

    #[test]
    fn no_transition_keeps_manual_state_and_refreshes_timestamp() {
        let before = vec![host("a", ThrottleStatus::Healthy, Some(TorrentStatus::Paused), Some(false))];
        let mut fresh = status("a", ThrottleStatus::Healthy);
        fresh.last_check = before[0].throttle_monitor.last_check + chrono::Duration::seconds(30);

        let after = reconcile(&before, std::slice::from_ref(&fresh));

        assert_eq!(client_status(&after[0]), TorrentStatus::Paused);
        assert!(!downloader_enabled(&after[0]));
        assert_eq!(after[0].throttle_monitor.last_check, fresh.last_check);
    }

    #[test]
    fn recovery_resumes_only_automation_held_clients() {
        let before = vec![
            host("a", ThrottleStatus::Healthy, Some(TorrentStatus::Online), Some(true)),
            host("b", ThrottleStatus::Throttled, Some(TorrentStatus::Paused), Some(false)),
        ];

        let throttled = reconcile(
            &before,
            &[status("a", ThrottleStatus::Throttled), status("b", ThrottleStatus::Throttled)],
        );
        let recovered = reconcile(
            &throttled,
            &[status("a", ThrottleStatus::Healthy), status("b", ThrottleStatus::Healthy)],
        );

        assert_eq!(client_status(&recovered[0]), TorrentStatus::Online);
        assert!(downloader_enabled(&recovered[0]));
        assert_eq!(client_status(&recovered[1]), TorrentStatus::Paused);
        assert!(downloader_enabled(&recovered[1]));
    }

    #[test]
    fn hosts_missing_from_the_poll_are_untouched() {
        let before = vec![
            host("a", ThrottleStatus::Healthy, Some(TorrentStatus::Online), None),
            host("b", ThrottleStatus::Healthy, Some(TorrentStatus::Online), None),
        ];
        let after = reconcile(&before, &[status("a", ThrottleStatus::Throttled)]);

        assert!(Arc::ptr_eq(&before[1], &after[1]));
        assert_eq!(after.len(), 2);
    }

    #[test]
    fn unknown_hosts_in_the_poll_are_ignored() {
        let before = vec![host("a", ThrottleStatus::Healthy, None, None)];
        let after = reconcile(&before, &[status("zz", ThrottleStatus::Throttled)]);

        assert_eq!(after.len(), 1);
        assert!(Arc::ptr_eq(&before[0], &after[0]));
    }

    #[test]
    fn transitions_report_direction() {
        let before = vec![
            host("a", ThrottleStatus::Healthy, None, None),
            host("b", ThrottleStatus::Throttled, None, None),
            host("c", ThrottleStatus::Healthy, None, None),
        ];
        let latest = [
            status("a", ThrottleStatus::Throttled),
            status("b", ThrottleStatus::Healthy),
            status("c", ThrottleStatus::Healthy),
        ];

        let kinds: Vec<_> = transitions(&before, &latest)
            .into_iter()
            .map(|t| (t.ip, t.kind))
            .collect();

        assert_eq!(
            kinds,
            vec![
                ("a".to_string(), TransitionKind::Throttled),
                ("b".to_string(), TransitionKind::Recovered),
            ]
        );
    }

    #[test]
    fn refresh_monitors_leaves_services_alone() {
        let before = vec![host("a", ThrottleStatus::Healthy, Some(TorrentStatus::Online), Some(true))];
        let after = refresh_monitors(&before, &[status("a", ThrottleStatus::Throttled)]);

        assert!(after[0].is_throttled());
        assert_eq!(client_status(&after[0]), TorrentStatus::Online);
        assert!(downloader_enabled(&after[0]));
    }
}
