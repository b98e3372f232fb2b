// ── Automation scheduler ──
//
// Owns the repeating timer that drives automation checks and keeps it in
// step with the automation settings. At most one timer is ever pending.

use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;

use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::controller::Sentinel;
use crate::observable::{Observable, lock};
use crate::settings::{AutomationConfig, SettingsStore};
use crate::stream::SnapshotStream;
use crate::timer::TimerSlot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "camelCase")]
pub enum SchedulerState {
    Stopped,
    Running {
        #[serde(with = "secs")]
        interval: Duration,
    },
}

impl SchedulerState {
    pub fn is_running(self) -> bool {
        matches!(self, Self::Running { .. })
    }
}

mod secs {
    use std::time::Duration;

    pub fn serialize<S: serde::Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_secs())
    }
}

/// Runs [`Sentinel::run_automation_check`] on the configured interval.
#[derive(Clone)]
pub struct AutomationScheduler {
    inner: Arc<SchedulerInner>,
}

struct SchedulerInner {
    sentinel: Sentinel,
    timer: TimerSlot,
    state: Observable<SchedulerState>,
    binding: Mutex<Option<CancellationToken>>,
    /// Held for the duration of a check, across timer restarts.
    checking: Arc<tokio::sync::Mutex<()>>,
}

impl AutomationScheduler {
    pub fn new(sentinel: Sentinel) -> Self {
        Self {
            inner: Arc::new(SchedulerInner {
                sentinel,
                timer: TimerSlot::new("automation"),
                state: Observable::new(SchedulerState::Stopped),
                binding: Mutex::new(None),
                checking: Arc::new(tokio::sync::Mutex::new(())),
            }),
        }
    }

    pub fn state(&self) -> SchedulerState {
        self.inner.state.get()
    }

    pub fn subscribe(&self) -> SnapshotStream<SchedulerState> {
        SnapshotStream::new(self.inner.state.watch())
    }

    /// Bring the timer in line with `config`.
    ///
    /// Disabled stops the timer. Enabled starts it, or restarts it when
    /// the interval changed; an unchanged interval keeps the running
    /// timer and its phase. Checks already in flight are never cancelled.
    pub fn apply(&self, config: &AutomationConfig) -> SchedulerState {
        self.inner.apply(config)
    }

    /// Follow the automation section of `settings` until [`stop`](Self::stop).
    ///
    /// The current config is applied immediately. Rebinding replaces the
    /// previous binding. Must be called inside a tokio runtime.
    pub fn bind(&self, settings: &SettingsStore) {
        let token = CancellationToken::new();
        if let Some(previous) = lock(&self.inner.binding).replace(token.clone()) {
            previous.cancel();
        }

        let mut last = settings.automation();
        self.inner.apply(&last);

        let mut stream = settings.subscribe();
        let weak: Weak<SchedulerInner> = Arc::downgrade(&self.inner);
        tokio::spawn(async move {
            loop {
                let settings = tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    next = stream.changed() => match next {
                        Some(settings) => settings,
                        None => break,
                    },
                };
                if settings.automation == last {
                    continue;
                }
                let Some(inner) = weak.upgrade() else { break };
                debug!(?settings.automation, "automation settings changed");
                last = settings.automation;
                inner.apply(&last);
            }
            debug!("scheduler binding ended");
        });
    }

    /// Stop the timer and drop any settings binding.
    pub fn stop(&self) {
        if let Some(binding) = lock(&self.inner.binding).take() {
            binding.cancel();
        }
        self.inner.stop();
    }
}

impl SchedulerInner {
    fn apply(&self, config: &AutomationConfig) -> SchedulerState {
        if !config.enabled {
            self.stop();
            return SchedulerState::Stopped;
        }

        let interval = config.interval();
        let wanted = SchedulerState::Running { interval };
        if self.state.get() == wanted && self.timer.is_armed() {
            return wanted;
        }

        let sentinel = self.sentinel.clone();
        let checking = Arc::clone(&self.checking);
        self.timer.arm_repeating(interval, move || {
            let sentinel = sentinel.clone();
            let checking = Arc::clone(&checking);
            // Awaited in the tick: a slow check delays the next one instead
            // of overlapping it. Stopping does not interrupt a running check.
            async move {
                let _running = checking.lock().await;
                let _ = sentinel.run_automation_check().await;
            }
        });
        info!(interval_secs = interval.as_secs(), action = %config.action, "automation scheduled");
        self.state.set(wanted);
        wanted
    }

    fn stop(&self) {
        if self.timer.cancel() {
            info!("automation stopped");
        }
        if self.state.get() != SchedulerState::Stopped {
            self.state.set(SchedulerState::Stopped);
        }
    }
}
