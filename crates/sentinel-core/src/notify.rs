// ── Notification surface ──
//
// A single transient message with auto-hide. Showing a new message
// replaces the current one and restarts the hide timer.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;
use tracing::debug;

use crate::observable::{Observable, Subscription};
use crate::stream::SnapshotStream;
use crate::timer::TimerSlot;

/// How long a message stays up when no duration is given.
pub const DEFAULT_TOAST_DURATION: Duration = Duration::from_millis(3000);

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Severity {
    Success,
    Error,
    #[default]
    Info,
}

/// The message currently on display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Toast {
    pub message: String,
    pub severity: Severity,
    pub shown_at: DateTime<Utc>,
}

/// Owner of the current toast. Clones share the same message and timer.
#[derive(Clone)]
pub struct Notifier {
    current: Observable<Option<Toast>>,
    hide_timer: Arc<TimerSlot>,
    default_duration: Duration,
}

impl Default for Notifier {
    fn default() -> Self {
        Self::new()
    }
}

impl Notifier {
    pub fn new() -> Self {
        Self::with_default_duration(DEFAULT_TOAST_DURATION)
    }

    pub fn with_default_duration(default_duration: Duration) -> Self {
        Self {
            current: Observable::new(None),
            hide_timer: Arc::new(TimerSlot::new("toast-hide")),
            default_duration,
        }
    }

    /// Display `message`, replacing whatever is shown, and hide it after
    /// `duration` (or the default). Must be called inside a tokio runtime.
    pub fn show(&self, message: impl Into<String>, severity: Severity, duration: Option<Duration>) {
        let toast = Toast {
            message: message.into(),
            severity,
            shown_at: Utc::now(),
        };
        debug!(%severity, message = %toast.message, "toast shown");
        self.current.set(Some(toast));

        let current = self.current.clone();
        self.hide_timer
            .arm_once(duration.unwrap_or(self.default_duration), move || async move {
                current.set(None);
            });
    }

    pub fn success(&self, message: impl Into<String>) {
        self.show(message, Severity::Success, None);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.show(message, Severity::Error, None);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.show(message, Severity::Info, None);
    }

    /// Clear the message now.
    pub fn hide(&self) {
        self.hide_timer.cancel();
        self.current.set(None);
    }

    pub fn current(&self) -> Option<Toast> {
        self.current.get()
    }

    pub fn subscribe(&self) -> SnapshotStream<Option<Toast>> {
        SnapshotStream::new(self.current.watch())
    }

    pub fn on_change(&self, callback: impl Fn(&Option<Toast>) + Send + Sync + 'static) -> Subscription {
        self.current.subscribe(callback)
    }
}
