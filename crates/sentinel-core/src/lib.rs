// sentinel-core: Fleet state, reconciliation, automation scheduling and settings.

pub mod activity;
pub mod controller;
pub mod error;
pub mod model;
pub mod notify;
pub mod observable;
pub mod poller;
pub mod scheduler;
pub mod settings;
pub mod store;
pub mod stream;
pub mod timer;

// ── Primary re-exports ──────────────────────────────────────────────
pub use activity::{ActivityEntry, ActivityLevel, ActivityLog, ActivitySource};
pub use controller::{CheckReport, Sentinel, SentinelBuilder, ToggleOutcome, ToggledState};
pub use error::CoreError;
pub use notify::{Notifier, Severity, Toast};
pub use observable::{Memo, Observable, Subscription};
pub use poller::{HttpStatusSource, PollKind, SimulatedStatusSource, StatusSource, demo_inventory};
pub use scheduler::{AutomationScheduler, SchedulerState};
pub use settings::{
    Account, AccountStatus, AutomationAction, AutomationConfig, FileStore, IntegrationSettings,
    KeyValueStore, MASKED_PASSWORD, MemoryStore, NotificationSettings, SETTINGS_KEY, Settings,
    SettingsStore,
};
pub use store::{FleetStore, HostTable, Transition, TransitionKind};
pub use stream::SnapshotStream;

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Downloader, FleetStats, Host, Inventory, ThrottleMonitor, ThrottleStatus, TorrentClient,
    TorrentStatus, assemble_hosts,
};
