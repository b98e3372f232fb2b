// ── Domain model ──

mod fleet;
mod host;
mod service;

pub use fleet::{FleetStats, assemble_hosts};
pub use host::{Host, ThrottleMonitor, ThrottleStatus};
pub use service::{Downloader, Inventory, TorrentClient, TorrentStatus};
