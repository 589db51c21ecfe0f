//! Named, cancellable one-shot timers
//!
//! Each [`TimerId`] maps to at most one pending callback. Scheduling
//! under an id that is already pending aborts the earlier task first.
//! Dropping the registry aborts everything still pending, so a discarded
//! controller never receives a late callback.

use std::collections::HashMap;
use std::future::Future;
use std::sync::{Arc, Weak};
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

/// Every timer the fishing client schedules
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TimerId {
    CastAnimation,
    FishBite,
    MissTimeout,
    ResultDisplay,
    AutofishFailsafe,
}

struct TimerEntry {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Timers {
    next_generation: u64,
    entries: HashMap<TimerId, TimerEntry>,
}

/// Timer table owned by a single controller. Must be used inside a
/// tokio runtime.
pub struct TimerRegistry {
    timers: Arc<Mutex<Timers>>,
}

impl TimerRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            timers: Arc::new(Mutex::new(Timers::default())),
        }
    }

    /// Schedule `callback` to run once after `delay`, replacing any timer
    /// already pending under `id`.
    pub fn set_timer<F>(&self, id: TimerId, delay: Duration, callback: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut timers = self.timers.lock();
        if let Some(previous) = timers.entries.remove(&id) {
            previous.handle.abort();
            tracing::debug!("[TIMER] Replaced pending {:?}", id);
        }

        timers.next_generation += 1;
        let generation = timers.next_generation;
        let table: Weak<Mutex<Timers>> = Arc::downgrade(&self.timers);

        // The entry is inserted before the lock is released, so the task
        // always finds it (or a newer one) when it wakes.
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if !Self::take_fired(&table, id, generation) {
                return;
            }
            tracing::trace!("[TIMER] {:?} fired", id);
            callback.await;
        });

        timers.entries.insert(id, TimerEntry { generation, handle });
    }

    /// Remove the entry of a timer that just fired. Returns false when the
    /// entry was cancelled or superseded in the meantime.
    fn take_fired(table: &Weak<Mutex<Timers>>, id: TimerId, generation: u64) -> bool {
        let Some(table) = table.upgrade() else {
            return false;
        };
        let mut timers = table.lock();
        match timers.entries.get(&id) {
            Some(entry) if entry.generation == generation => {
                timers.entries.remove(&id);
                true
            }
            _ => false,
        }
    }

    /// Cancel the timer under `id`; no-op when none is pending
    pub fn clear_timer(&self, id: TimerId) {
        if let Some(entry) = self.timers.lock().entries.remove(&id) {
            entry.handle.abort();
            tracing::trace!("[TIMER] Cleared {:?}", id);
        }
    }

    /// Cancel every pending timer
    pub fn clear_all(&self) {
        let drained: Vec<_> = self.timers.lock().entries.drain().collect();
        for (id, entry) in drained {
            entry.handle.abort();
            tracing::trace!("[TIMER] Cleared {:?}", id);
        }
    }

    /// Whether a timer is pending under `id`
    pub fn has_timer(&self, id: TimerId) -> bool {
        self.timers.lock().entries.contains_key(&id)
    }

    /// Number of pending timers
    pub fn pending(&self) -> usize {
        self.timers.lock().entries.len()
    }
}

impl Default for TimerRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TimerRegistry {
    fn drop(&mut self) {
        self.clear_all();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    fn counter() -> Arc<AtomicUsize> {
        Arc::new(AtomicUsize::new(0))
    }

    fn bump(count: &Arc<AtomicUsize>) -> impl Future<Output = ()> + Send + 'static {
        let count = count.clone();
        async move {
            count.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fires_once_after_delay() {
        let registry = TimerRegistry::new();
        let fired = counter();

        registry.set_timer(TimerId::FishBite, Duration::from_millis(100), bump(&fired));
        assert!(registry.has_timer(TimerId::FishBite));

        sleep(Duration::from_millis(99)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(2)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
        assert!(!registry.has_timer(TimerId::FishBite));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reset_replaces_pending_callback() {
        let registry = TimerRegistry::new();
        let first = counter();
        let second = counter();

        registry.set_timer(TimerId::MissTimeout, Duration::from_millis(100), bump(&first));
        sleep(Duration::from_millis(50)).await;
        registry.set_timer(TimerId::MissTimeout, Duration::from_millis(200), bump(&second));
        assert_eq!(registry.pending(), 1);

        sleep(Duration::from_millis(100)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 0);

        sleep(Duration::from_millis(101)).await;
        assert_eq!(first.load(Ordering::SeqCst), 0);
        assert_eq!(second.load(Ordering::SeqCst), 1);

        sleep(Duration::from_secs(1)).await;
        assert_eq!(second.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_timer_prevents_fire() {
        let registry = TimerRegistry::new();
        let fired = counter();

        registry.set_timer(TimerId::ResultDisplay, Duration::from_millis(100), bump(&fired));
        registry.clear_timer(TimerId::ResultDisplay);
        registry.clear_timer(TimerId::ResultDisplay);
        assert!(!registry.has_timer(TimerId::ResultDisplay));

        sleep(Duration::from_millis(500)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_clear_all_and_ids_are_independent() {
        let registry = TimerRegistry::new();
        let fired = counter();

        registry.set_timer(TimerId::CastAnimation, Duration::from_millis(10), bump(&fired));
        registry.set_timer(TimerId::FishBite, Duration::from_millis(20), bump(&fired));
        registry.set_timer(TimerId::MissTimeout, Duration::from_millis(30), bump(&fired));
        assert_eq!(registry.pending(), 3);

        sleep(Duration::from_millis(15)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);

        registry.clear_all();
        assert_eq!(registry.pending(), 0);
        sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_drop_cancels_pending() {
        let fired = counter();
        {
            let registry = TimerRegistry::new();
            registry.set_timer(TimerId::AutofishFailsafe, Duration::from_millis(10), bump(&fired));
        }
        sleep(Duration::from_millis(100)).await;
        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }
}
