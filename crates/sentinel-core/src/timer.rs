// ── Owned timer handles ──
//
// One `TimerSlot` per deferred concern (automation interval, settings
// autosave, notification auto-hide). Arming a slot always cancels the
// previous timer first, so a slot never has more than one pending
// instance. Cancellation only stops future firings: a task body that
// already started runs to completion.

use std::future::Future;
use std::sync::Mutex;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::trace;

use crate::observable::lock;

struct Armed {
    cancel: CancellationToken,
    handle: JoinHandle<()>,
}

/// A single-occupancy timer. Must be armed from within a tokio runtime.
pub struct TimerSlot {
    name: &'static str,
    pending: Mutex<Option<Armed>>,
}

impl TimerSlot {
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            pending: Mutex::new(None),
        }
    }

    /// Run `task` once after `delay`, replacing any pending timer. The slot
    /// stops counting as armed as soon as the delay elapses.
    pub fn arm_once<F, Fut>(&self, delay: Duration, task: F)
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut pending = lock(&self.pending);
        cancel_armed(pending.take());

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let name = self.name;
        let handle = tokio::spawn(async move {
            tokio::select! {
                biased;
                () = token.cancelled() => trace!(timer = name, "one-shot timer cancelled"),
                () = tokio::time::sleep(delay) => {
                    // Fired: no longer pending, even while the body runs.
                    token.cancel();
                    task().await;
                }
            }
        });

        *pending = Some(Armed { cancel, handle });
    }

    /// Run `task` every `period`, first after one full period, replacing
    /// any pending timer. A run that overlaps the next tick delays it
    /// rather than bursting.
    pub fn arm_repeating<F, Fut>(&self, period: Duration, mut task: F)
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let mut pending = lock(&self.pending);
        cancel_armed(pending.take());

        let cancel = CancellationToken::new();
        let token = cancel.clone();
        let name = self.name;
        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval.tick().await; // consume the immediate first tick

            loop {
                tokio::select! {
                    biased;
                    () = token.cancelled() => break,
                    _ = interval.tick() => task().await,
                }
            }
            trace!(timer = name, "repeating timer stopped");
        });

        *pending = Some(Armed { cancel, handle });
    }

    /// Cancel the pending timer. Returns `true` if one was armed and had not
    /// fired yet.
    pub fn cancel(&self) -> bool {
        let armed = lock(&self.pending).take();
        let was_armed = armed
            .as_ref()
            .is_some_and(|a| !a.handle.is_finished() && !a.cancel.is_cancelled());
        cancel_armed(armed);
        was_armed
    }

    pub fn is_armed(&self) -> bool {
        lock(&self.pending)
            .as_ref()
            .is_some_and(|a| !a.handle.is_finished() && !a.cancel.is_cancelled())
    }
}

impl Drop for TimerSlot {
    fn drop(&mut self) {
        cancel_armed(lock(&self.pending).take());
    }
}

fn cancel_armed(armed: Option<Armed>) {
    if let Some(armed) = armed {
        // Dropping the JoinHandle detaches the task; it exits on its own
        // once it observes the token.
        armed.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> Arc<AtomicUsize>) {
        let count = Arc::new(AtomicUsize::new(0));
        let source = Arc::clone(&count);
        (count, move || Arc::clone(&source))
    }

    #[tokio::test(start_paused = true)]
    async fn rearming_replaces_the_pending_one_shot() {
        let slot = TimerSlot::new("test");
        let (count, handle) = counter();

        for _ in 0..3 {
            let c = handle();
            slot.arm_once(Duration::from_millis(100), move || async move {
                c.fetch_add(1, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        tokio::time::sleep(Duration::from_millis(200)).await;

        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!slot.is_armed());
    }

    #[tokio::test(start_paused = true)]
    async fn cancel_prevents_firing() {
        let slot = TimerSlot::new("test");
        let (count, handle) = counter();
        let c = handle();
        slot.arm_once(Duration::from_secs(1), move || async move {
            c.fetch_add(1, Ordering::SeqCst);
        });

        assert!(slot.is_armed());
        assert!(slot.cancel());
        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn fired_one_shot_is_no_longer_armed() {
        let slot = TimerSlot::new("test");
        let (count, handle) = counter();
        let c = handle();
        slot.arm_once(Duration::from_millis(100), move || async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            c.fetch_add(1, Ordering::SeqCst);
        });

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert!(!slot.is_armed());
        assert!(!slot.cancel());

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn repeating_timer_ticks_until_cancelled() {
        let slot = TimerSlot::new("test");
        let (count, handle) = counter();
        let c = handle();
        slot.arm_repeating(Duration::from_secs(10), move || {
            let c = Arc::clone(&c);
            async move {
                c.fetch_add(1, Ordering::SeqCst);
            }
        });

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);

        slot.cancel();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }
}
