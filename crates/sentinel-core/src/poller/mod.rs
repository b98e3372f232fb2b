// ── Status poller ──
//
// Where throttling observations come from. The scheduler and the
// controller only see the `StatusSource` trait.

mod http;
mod simulated;

use futures_util::future::BoxFuture;

use crate::error::CoreError;
use crate::model::ThrottleMonitor;

pub use http::HttpStatusSource;
pub use simulated::{FLAPPING_HOST, SimulatedStatusSource, demo_inventory};

/// Why a poll is made. Sources may answer differently for the first load.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollKind {
    /// Building the fleet at startup.
    Initial,
    /// A scheduled or manually triggered automation check.
    Automation,
}

/// A provider of per-host throttling status.
///
/// A poll may return only a subset of the fleet; hosts it omits keep
/// their previous state.
pub trait StatusSource: Send + Sync {
    fn fetch_status(&self, kind: PollKind) -> BoxFuture<'_, Result<Vec<ThrottleMonitor>, CoreError>>;

    /// Short label for logs.
    fn describe(&self) -> String;
}
