// ── Reactive fleet store ──
//
// Holds the host table as a copy-on-write snapshot. Every mutation
// builds a new `Vec` sharing the untouched `Arc<Host>` entries with the
// previous one and publishes it in a single step.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use crate::model::{FleetStats, Host};
use crate::observable::{Memo, Observable, Subscription};
use crate::stream::SnapshotStream;

/// A published host table. Cheap to clone and safe to keep.
pub type HostTable = Arc<Vec<Arc<Host>>>;

/// The authoritative in-memory collection of hosts, keyed by IP.
#[derive(Clone)]
pub struct FleetStore {
    hosts: Observable<HostTable>,
    stats: Arc<Memo<HostTable, FleetStats>>,
    last_refresh: Observable<Option<DateTime<Utc>>>,
}

impl Default for FleetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetStore {
    pub fn new() -> Self {
        let hosts = Observable::new(HostTable::default());
        let stats = Arc::new(Memo::new(hosts.clone(), |table: &HostTable| {
            FleetStats::from_hosts(table)
        }));
        Self {
            hosts,
            stats,
            last_refresh: Observable::new(None),
        }
    }

    // ── Snapshot accessors ───────────────────────────────────────────

    /// All hosts in insertion order.
    pub fn list(&self) -> HostTable {
        self.hosts.get()
    }

    pub fn get(&self, ip: &str) -> Option<Arc<Host>> {
        self.hosts
            .with(|table| table.iter().find(|h| h.ip == ip).map(Arc::clone))
    }

    pub fn len(&self) -> usize {
        self.hosts.with(|table| table.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Aggregate totals, recomputed only when the table changed.
    pub fn stats(&self) -> FleetStats {
        self.stats.get()
    }

    /// Monotonic change counter of the host table.
    pub fn version(&self) -> u64 {
        self.hosts.version()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Replace the whole table and stamp the refresh time. Duplicate IPs
    /// keep their first entry.
    pub fn replace_all(&self, hosts: Vec<Host>) {
        let mut table: Vec<Arc<Host>> = Vec::with_capacity(hosts.len());
        for host in hosts {
            if table.iter().any(|h| h.ip == host.ip) {
                warn!(ip = %host.ip, "duplicate host ignored");
                continue;
            }
            table.push(Arc::new(host));
        }
        debug!(hosts = table.len(), "fleet table replaced");
        self.hosts.set(Arc::new(table));
        self.last_refresh.set(Some(Utc::now()));
    }

    /// Replace one host with `f(current)`.
    ///
    /// Returns `false` (and changes nothing) when no host has this IP.
    pub fn update_host(&self, ip: &str, f: impl FnOnce(&Host) -> Host) -> bool {
        self.modify_host(ip, |host| (Some(f(host)), ())).is_some()
    }

    /// Atomic read-decide-write on one host.
    ///
    /// `f` returns the replacement (or `None` to leave the host as is)
    /// and a result for the caller. Returns `None` when no host has this
    /// IP. A replacement that changes the IP is refused.
    pub fn modify_host<R>(&self, ip: &str, f: impl FnOnce(&Host) -> (Option<Host>, R)) -> Option<R> {
        self.hosts.modify(|table| {
            let Some(idx) = table.iter().position(|h| h.ip == ip) else {
                return (None, None);
            };
            let (next, result) = f(&table[idx]);
            let Some(next) = next else {
                return (None, Some(result));
            };
            if next.ip != ip {
                warn!(ip, attempted = %next.ip, "refusing to change a host's ip");
                return (None, Some(result));
            }

            let mut updated: Vec<Arc<Host>> = table.iter().map(Arc::clone).collect();
            updated[idx] = Arc::new(next);
            (Some(Arc::new(updated)), Some(result))
        })
    }

    /// Replace the whole table with `f(current)` in one atomic step.
    ///
    /// Used to apply a reconciliation pass against the state current at
    /// commit time rather than the one captured when the poll started.
    pub fn apply<R>(&self, f: impl FnOnce(&[Arc<Host>]) -> (Vec<Arc<Host>>, R)) -> R {
        let result = self.hosts.modify(|table| {
            let (next, result) = f(table);
            (Some(Arc::new(next)), result)
        });
        self.last_refresh.set(Some(Utc::now()));
        result
    }

    // ── Refresh bookkeeping ──────────────────────────────────────────

    pub fn last_refresh(&self) -> Option<DateTime<Utc>> {
        self.last_refresh.get()
    }

    /// Time since the last successful poll, if any.
    pub fn data_age(&self) -> Option<Duration> {
        self.last_refresh()
            .and_then(|at| (Utc::now() - at).to_std().ok())
    }

    // ── Subscriptions ────────────────────────────────────────────────

    pub fn subscribe(&self) -> SnapshotStream<HostTable> {
        SnapshotStream::new(self.hosts.watch())
    }

    /// Run `callback` synchronously after every table change.
    pub fn on_change(&self, callback: impl Fn(&HostTable) + Send + Sync + 'static) -> Subscription {
        self.hosts.subscribe(callback)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::{ThrottleMonitor, ThrottleStatus};
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn host(ip: &str) -> Host {
        Host::from_monitor(ThrottleMonitor::new(ip, format!("VPS-{ip}"), ThrottleStatus::Healthy))
    }

    fn store_with(ips: &[&str]) -> FleetStore {
        let store = FleetStore::new();
        store.replace_all(ips.iter().map(|ip| host(ip)).collect());
        store
    }

    #[test]
    fn lookup_by_ip() {
        let store = store_with(&["10.0.0.1", "10.0.0.2"]);
        assert_eq!(store.len(), 2);
        assert_eq!(store.get("10.0.0.2").unwrap().name, "VPS-10.0.0.2");
        assert!(store.get("10.0.0.9").is_none());
    }

    #[test]
    fn duplicate_ips_keep_the_first() {
        let store = FleetStore::new();
        let mut second = host("a");
        second.name = "second".into();
        store.replace_all(vec![host("a"), second]);

        assert_eq!(store.len(), 1);
        assert_eq!(store.get("a").unwrap().name, "VPS-a");
    }

    #[test]
    fn unknown_ip_is_a_noop() {
        let store = store_with(&["a"]);
        let before = store.version();

        assert!(!store.update_host("zz", Clone::clone));
        assert_eq!(store.version(), before);
    }

    #[test]
    fn update_shares_untouched_hosts() {
        let store = store_with(&["a", "b"]);
        let before = store.list();

        store.update_host("a", |h| Host {
            name: "renamed".into(),
            ..h.clone()
        });
        let after = store.list();

        assert_eq!(after[0].name, "renamed");
        assert!(Arc::ptr_eq(&before[1], &after[1]));
        assert_eq!(before[0].name, "VPS-a");
    }

    #[test]
    fn ip_changes_are_refused() {
        let store = store_with(&["a"]);
        store.update_host("a", |h| Host {
            ip: "b".into(),
            ..h.clone()
        });
        assert!(store.get("a").is_some());
        assert!(store.get("b").is_none());
    }

    #[test]
    fn observers_fire_once_per_mutation() {
        let store = store_with(&["a"]);
        let calls = Arc::new(AtomicUsize::new(0));
        let calls_cb = Arc::clone(&calls);
        let _sub = store.on_change(move |_| {
            calls_cb.fetch_add(1, Ordering::SeqCst);
        });

        store.update_host("a", Clone::clone);
        store.apply(|table| (table.to_vec(), ()));

        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn apply_records_refresh_time() {
        let store = FleetStore::new();
        assert!(store.last_refresh().is_none());
        store.apply(|table| (table.to_vec(), ()));
        assert!(store.last_refresh().is_some());
        assert!(store.data_age().is_some());
    }

    #[test]
    fn stats_track_the_table() {
        let store = store_with(&["a", "b"]);
        assert_eq!(store.stats().total_hosts, 2);
        store.update_host("b", |h| {
            let mut next = h.clone();
            next.throttle_monitor.status = ThrottleStatus::Throttled;
            next
        });
        assert_eq!(store.stats().throttled_hosts, 1);
    }

    #[tokio::test]
    async fn subscribers_receive_new_tables() {
        let store = store_with(&["a"]);
        let mut stream = store.subscribe();
        assert_eq!(stream.current().len(), 1);

        store.replace_all(vec![host("a"), host("b")]);
        let next = stream.changed().await.unwrap();
        assert_eq!(next.len(), 2);
    }
}
