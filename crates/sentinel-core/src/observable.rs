// ── Observable values ──
//
// A typed container with synchronous change callbacks and async `watch`
// receivers. The fleet, settings and notification stores are all built
// on it. Every mutation runs to completion inside the `watch` sender's
// write lock, so readers see the previous value or the next one, never
// something in between.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use tokio::sync::watch;

type Callback<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// Lock a std mutex, recovering the data if a callback panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// A shared, observable value.
///
/// Cheaply cloneable; all clones observe and mutate the same value.
pub struct Observable<T> {
    inner: Arc<Inner<T>>,
}

struct Inner<T> {
    value: watch::Sender<T>,
    /// Bumped inside the write lock on every effective change.
    version: AtomicU64,
    next_id: AtomicU64,
    callbacks: Mutex<Vec<(u64, Callback<T>)>>,
}

impl<T> Clone for Observable<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone + Send + Sync + 'static> Observable<T> {
    pub fn new(initial: T) -> Self {
        let (value, _) = watch::channel(initial);
        Self {
            inner: Arc::new(Inner {
                value,
                version: AtomicU64::new(0),
                next_id: AtomicU64::new(0),
                callbacks: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Clone out the current value.
    pub fn get(&self) -> T {
        self.inner.value.borrow().clone()
    }

    /// Read the current value in place.
    ///
    /// The read lock is held for the duration of `f`; do not mutate this
    /// observable from inside it.
    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.inner.value.borrow())
    }

    /// Monotonic change counter. Starts at 0.
    pub fn version(&self) -> u64 {
        self.inner.version.load(Ordering::Acquire)
    }

    /// Replace the value unconditionally.
    pub fn set(&self, value: T) {
        self.modify(move |_| (Some(value), ()));
    }

    /// Replace the value with `f(current)`.
    pub fn update(&self, f: impl FnOnce(&T) -> T) {
        self.modify(|current| (Some(f(current)), ()));
    }

    /// Atomic read-decide-write.
    ///
    /// `f` sees the current value and returns the replacement (or `None`
    /// to leave it untouched) together with a result for the caller.
    /// Subscribers are only notified when a replacement was returned.
    pub fn modify<R>(&self, f: impl FnOnce(&T) -> (Option<T>, R)) -> R {
        let mut out = None;
        let version = &self.inner.version;

        let changed = self.inner.value.send_if_modified(|current| {
            let (next, result) = f(current);
            out = Some(result);
            match next {
                Some(next) => {
                    *current = next;
                    version.fetch_add(1, Ordering::AcqRel);
                    true
                }
                None => false,
            }
        });

        if changed {
            self.notify();
        }

        match out {
            Some(result) => result,
            None => unreachable!("send_if_modified always runs its closure"),
        }
    }

    /// Register a callback invoked with the new value after every change.
    ///
    /// Callbacks run synchronously on the mutating task, outside any lock,
    /// so they may read or even mutate this observable. The callback stays
    /// registered until the returned [`Subscription`] is dropped.
    pub fn subscribe(&self, callback: impl Fn(&T) + Send + Sync + 'static) -> Subscription {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        lock(&self.inner.callbacks).push((id, Arc::new(callback)));

        let weak: Weak<Inner<T>> = Arc::downgrade(&self.inner);
        Subscription {
            cancel: Some(Box::new(move || {
                if let Some(inner) = weak.upgrade() {
                    lock(&inner.callbacks).retain(|(cid, _)| *cid != id);
                }
            })),
        }
    }

    /// Async receiver for consumers that prefer `changed().await`.
    pub fn watch(&self) -> watch::Receiver<T> {
        self.inner.value.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        lock(&self.inner.callbacks).len()
    }

    fn notify(&self) {
        let callbacks: Vec<Callback<T>> = lock(&self.inner.callbacks)
            .iter()
            .map(|(_, cb)| Arc::clone(cb))
            .collect();
        if callbacks.is_empty() {
            return;
        }
        let snapshot = self.get();
        for cb in callbacks {
            cb(&snapshot);
        }
    }
}

/// Handle returned by [`Observable::subscribe`]. Dropping it unsubscribes.
#[must_use = "dropping a Subscription unsubscribes its callback"]
pub struct Subscription {
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn unsubscribe(mut self) {
        self.cancel_now();
    }

    /// Keep the callback registered for the lifetime of the observable.
    pub fn detach(mut self) {
        self.cancel = None;
    }

    fn cancel_now(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel_now();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.cancel.is_some())
            .finish()
    }
}

// ── Derived values ───────────────────────────────────────────────────

/// A value derived from an [`Observable`] by a pure function, recomputed
/// lazily the first time it is read after the source changed.
pub struct Memo<T, D> {
    source: Observable<T>,
    compute: Box<dyn Fn(&T) -> D + Send + Sync>,
    cache: Mutex<Option<(u64, D)>>,
}

impl<T: Clone + Send + Sync + 'static, D: Clone> Memo<T, D> {
    pub fn new(source: Observable<T>, compute: impl Fn(&T) -> D + Send + Sync + 'static) -> Self {
        Self {
            source,
            compute: Box::new(compute),
            cache: Mutex::new(None),
        }
    }

    pub fn get(&self) -> D {
        let mut cache = lock(&self.cache);
        // Read the version before the value: a concurrent change can only
        // make the cache look older than it is, never newer.
        let version = self.source.version();
        if let Some((cached_at, derived)) = cache.as_ref() {
            if *cached_at == version {
                return derived.clone();
            }
        }
        let derived = self.source.with(|value| (self.compute)(value));
        *cache = Some((version, derived.clone()));
        derived
    }
}
