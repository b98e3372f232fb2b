// ── Activity journal ──
//
// Bounded in-memory record of what automation and users did to the
// fleet. Oldest entries are dropped first.

use std::collections::VecDeque;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use strum::Display;

use crate::observable::{Observable, Subscription};
use crate::stream::SnapshotStream;

/// Entries kept before the oldest is evicted.
pub const ACTIVITY_CAPACITY: usize = 500;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum ActivityLevel {
    Info,
    Warn,
    Error,
}

/// Which part of the fleet an entry is about.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
pub enum ActivitySource {
    Monitor,
    TorrentClient,
    Downloader,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityEntry {
    /// Monotonic sequence number, unique for the lifetime of the log.
    pub seq: u64,
    pub timestamp: DateTime<Utc>,
    pub level: ActivityLevel,
    pub source: ActivitySource,
    pub message: String,
}

#[derive(Debug, Clone, Default)]
struct Journal {
    entries: VecDeque<ActivityEntry>,
    next_seq: u64,
}

/// Shared handle to the journal.
#[derive(Clone)]
pub struct ActivityLog {
    journal: Observable<Arc<Journal>>,
    capacity: usize,
}

impl Default for ActivityLog {
    fn default() -> Self {
        Self::new()
    }
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::with_capacity(ACTIVITY_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            journal: Observable::new(Arc::new(Journal::default())),
            capacity: capacity.max(1),
        }
    }

    pub fn record(&self, level: ActivityLevel, source: ActivitySource, message: impl Into<String>) {
        let message = message.into();
        let capacity = self.capacity;
        self.journal.update(move |journal| {
            let mut next = (**journal).clone();
            next.entries.push_back(ActivityEntry {
                seq: next.next_seq,
                timestamp: Utc::now(),
                level,
                source,
                message,
            });
            next.next_seq += 1;
            while next.entries.len() > capacity {
                next.entries.pop_front();
            }
            Arc::new(next)
        });
    }

    pub fn info(&self, source: ActivitySource, message: impl Into<String>) {
        self.record(ActivityLevel::Info, source, message);
    }

    pub fn warn(&self, source: ActivitySource, message: impl Into<String>) {
        self.record(ActivityLevel::Warn, source, message);
    }

    pub fn error(&self, source: ActivitySource, message: impl Into<String>) {
        self.record(ActivityLevel::Error, source, message);
    }

    /// All retained entries, oldest first.
    pub fn entries(&self) -> Vec<ActivityEntry> {
        self.journal.with(|j| j.entries.iter().cloned().collect())
    }

    /// Entries with a sequence number of at least `seq`.
    pub fn since(&self, seq: u64) -> Vec<ActivityEntry> {
        self.journal
            .with(|j| j.entries.iter().filter(|e| e.seq >= seq).cloned().collect())
    }

    pub fn len(&self) -> usize {
        self.journal.with(|j| j.entries.len())
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Sequence number the next entry will get.
    pub fn next_seq(&self) -> u64 {
        self.journal.with(|j| j.next_seq)
    }

    /// Wakes on every new entry. Pair with [`since`](Self::since).
    pub fn subscribe(&self) -> ActivityStream {
        ActivityStream {
            inner: SnapshotStream::new(self.journal.watch()),
            cursor: self.next_seq(),
        }
    }

    pub fn on_record(&self, callback: impl Fn(&ActivityEntry) + Send + Sync + 'static) -> Subscription {
        self.journal.subscribe(move |journal| {
            if let Some(last) = journal.entries.back() {
                callback(last);
            }
        })
    }
}

/// Async iterator over newly recorded entries.
pub struct ActivityStream {
    inner: SnapshotStream<Arc<Journal>>,
    cursor: u64,
}

impl ActivityStream {
    /// Wait for new entries. Returns `None` once the log is dropped.
    ///
    /// Entries evicted before the reader caught up are skipped.
    pub async fn next_batch(&mut self) -> Option<Vec<ActivityEntry>> {
        loop {
            let journal = self.inner.changed().await?;
            let fresh: Vec<ActivityEntry> = journal
                .entries
                .iter()
                .filter(|e| e.seq >= self.cursor)
                .cloned()
                .collect();
            if let Some(last) = fresh.last() {
                self.cursor = last.seq + 1;
                return Some(fresh);
            }
        }
    }
}
