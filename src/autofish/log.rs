//! Bounded, time-windowed log of autofish attempts

use std::collections::VecDeque;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::time::Instant;

use crate::fish::Fish;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptRecord {
    pub fish: Option<Fish>,
    pub success: bool,
    pub timestamp: DateTime<Utc>,
    /// Monotonic time used for pruning
    #[serde(skip)]
    pub at: Instant,
}

impl AttemptRecord {
    /// Record stamped with the current time
    pub fn new(fish: Option<Fish>, success: bool) -> Self {
        Self {
            fish,
            success,
            timestamp: Utc::now(),
            at: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AttemptLog {
    entries: VecDeque<AttemptRecord>,
    lifetime: Duration,
    capacity: usize,
}

impl AttemptLog {
    /// Create an empty log
    pub fn new(lifetime: Duration, capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity),
            lifetime,
            capacity,
        }
    }

    /// Drop expired entries, append `record`, then trim to capacity
    pub fn push(&mut self, record: AttemptRecord) {
        self.prune(record.at);
        self.entries.push_back(record);
        self.trim();
    }

    /// Remove entries older than the lifetime as of `now`
    pub fn prune(&mut self, now: Instant) {
        while let Some(oldest) = self.entries.front() {
            if now.saturating_duration_since(oldest.at) > self.lifetime {
                self.entries.pop_front();
            } else {
                break;
            }
        }
    }

    /// Change the cap, dropping the oldest entries when it shrinks
    pub fn set_capacity(&mut self, capacity: usize) {
        self.capacity = capacity;
        self.trim();
    }

    fn trim(&mut self) {
        while self.entries.len() > self.capacity {
            self.entries.pop_front();
        }
    }

    /// Get the current cap
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Remove every entry
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Number of entries kept
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the log holds no entries
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Oldest first
    pub fn entries(&self) -> impl Iterator<Item = &AttemptRecord> {
        self.entries.iter()
    }
}
