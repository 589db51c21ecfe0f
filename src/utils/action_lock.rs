//! Single-slot reentrancy guard for one-shot async actions
//!
//! Used wherever a user action must not run twice at once (catch button
//! mashing, a second cast while the first request is in flight). The lock
//! stays held for the whole action plus an optional trailing cooldown, and
//! is released even when the action errors, panics, or is dropped.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tokio::task::JoinHandle;

struct LockInner {
    name: &'static str,
    locked: AtomicBool,
    cooldown: Option<Duration>,
    /// Bumped on every acquisition; a cooldown release only applies to
    /// the acquisition it was scheduled for.
    epoch: AtomicU64,
    pending_release: Mutex<Option<JoinHandle<()>>>,
}

#[derive(Clone)]
pub struct ActionLock {
    inner: Arc<LockInner>,
}

impl ActionLock {
    /// Lock released as soon as the action finishes
    pub fn new(name: &'static str) -> Self {
        Self::build(name, None)
    }

    /// Lock held for `cooldown` after the action finishes
    pub fn with_cooldown(name: &'static str, cooldown: Duration) -> Self {
        Self::build(name, Some(cooldown).filter(|c| !c.is_zero()))
    }

    fn build(name: &'static str, cooldown: Option<Duration>) -> Self {
        Self {
            inner: Arc::new(LockInner {
                name,
                locked: AtomicBool::new(false),
                cooldown,
                epoch: AtomicU64::new(0),
                pending_release: Mutex::new(None),
            }),
        }
    }

    /// Whether an action or its cooldown holds the lock
    pub fn is_locked(&self) -> bool {
        self.inner.locked.load(Ordering::SeqCst)
    }

    /// Run `action` unless the lock is held. Returns `None` without
    /// calling `action` when it is.
    pub async fn with_lock<F, Fut, T>(&self, action: F) -> Option<T>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = T>,
    {
        if !self.try_lock() {
            tracing::debug!("[LOCK] {} busy, action skipped", self.inner.name);
            return None;
        }
        let _guard = LockGuard { lock: self };
        Some(action().await)
    }

    /// Acquire if free. Call [`unlock`](Self::unlock) (or
    /// [`release`](Self::release) to honour the cooldown) when done.
    pub fn try_lock(&self) -> bool {
        if self
            .inner
            .locked
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return false;
        }
        self.on_acquired();
        true
    }

    /// Take the lock unconditionally
    pub fn lock(&self) {
        self.inner.locked.store(true, Ordering::SeqCst);
        self.on_acquired();
    }

    /// Release immediately, dropping any pending cooldown release
    pub fn unlock(&self) {
        self.cancel_pending_release();
        self.inner.locked.store(false, Ordering::SeqCst);
    }

    /// Release after the configured cooldown, or now when there is none
    pub fn release(&self) {
        let Some(cooldown) = self.inner.cooldown else {
            self.inner.locked.store(false, Ordering::SeqCst);
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            self.inner.locked.store(false, Ordering::SeqCst);
            return;
        };

        let epoch = self.inner.epoch.load(Ordering::SeqCst);
        let inner = Arc::downgrade(&self.inner);
        let task = runtime.spawn(async move {
            tokio::time::sleep(cooldown).await;
            if let Some(inner) = inner.upgrade() {
                if inner.epoch.load(Ordering::SeqCst) == epoch {
                    inner.locked.store(false, Ordering::SeqCst);
                }
            }
        });
        if let Some(previous) = self.inner.pending_release.lock().replace(task) {
            previous.abort();
        }
    }

    fn on_acquired(&self) {
        self.cancel_pending_release();
        self.inner.epoch.fetch_add(1, Ordering::SeqCst);
    }

    fn cancel_pending_release(&self) {
        if let Some(task) = self.inner.pending_release.lock().take() {
            task.abort();
        }
    }
}

struct LockGuard<'a> {
    lock: &'a ActionLock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        self.lock.release();
    }
}
