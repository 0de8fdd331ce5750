use std::future::Future;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::sync::Arc;

use tokio::sync::Notify;
use tokio::sync::Semaphore;
use tracing::debug;

// Keeps the in-flight counter consistent even if a refresh panics.
struct PendingGuard {
    pending: Arc<AtomicUsize>,
    idle:    Arc<Notify>,
}

impl Drop for PendingGuard {
    fn drop(&mut self) {
        if self.pending.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.idle.notify_waiters();
        }
    }
}

/// Bounded pool for fire-and-forget background refreshes.
///
/// Submitting never waits: a task is spawned right away and waits for a free slot on its own. Nothing is deduplicated
/// or cancelled.
///
/// Only the number of running refreshes is bounded, the number of waiting ones is not. If refreshes never complete,
/// e.g. the market API hangs and there is no hydration timeout configured, every submission parks one more task for
/// good. Set [`CacheConfig::hydrate_timeout`](crate::config::CacheConfig::hydrate_timeout) to put an upper limit on
/// how long a slot can be held.
#[derive(Clone, Debug)]
pub struct RefreshPool {
    slots:   Arc<Semaphore>,
    pending: Arc<AtomicUsize>,
    idle:    Arc<Notify>,
}

impl RefreshPool {
    pub fn new(workers: usize) -> Self {
        Self {
            slots:   Arc::new(Semaphore::new(workers.max(1))),
            pending: Arc::new(AtomicUsize::new(0)),
            idle:    Arc::new(Notify::new()),
        }
    }

    pub fn submit<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.pending.fetch_add(1, Ordering::AcqRel);
        let guard = PendingGuard {
            pending: self.pending.clone(),
            idle:    self.idle.clone(),
        };
        let slots = self.slots.clone();

        tokio::spawn(async move {
            let _guard = guard;
            // The semaphore is never closed.
            let Ok(_permit) = slots.acquire_owned().await
            else {
                return;
            };
            task.await;
        });
    }

    /// Number of submitted refreshes that haven't completed yet, running or waiting for a slot.
    pub fn pending(&self) -> usize {
        self.pending.load(Ordering::Acquire)
    }

    /// Wait until every refresh submitted so far, and any submitted meanwhile, has completed.
    pub async fn drain(&self) {
        loop {
            let idle = self.idle.notified();
            if self.pending() == 0 {
                break;
            }
            debug!("Waiting for {} background refreshes", self.pending());
            idle.await;
        }
    }
}

impl Default for RefreshPool {
    fn default() -> Self {
        Self::new(1)
    }
}
