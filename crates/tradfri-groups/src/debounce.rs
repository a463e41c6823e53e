//! Keyed debouncing
//!
//! Each key has at most one pending action. Scheduling an action for a key
//! that already has one pending aborts the earlier one, so a burst of
//! triggers results in a single action running after the last of them.
//! Once an action's delay has elapsed it is no longer pending and runs to
//! completion even if the key is scheduled again meanwhile.
//!
//! Besides the pending table, every action is counted as in flight from
//! the moment it is scheduled until it completes or is aborted, so callers
//! can wait for all scheduled work to be finished.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt::Debug;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::debug;

struct PendingAction {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct InFlight {
    count: AtomicUsize,
    idle: Notify,
}

/// Decrements the in-flight count when the action's task is dropped,
/// whether it finished or was aborted.
struct InFlightGuard(Arc<InFlight>);

impl InFlightGuard {
    fn enter(in_flight: &Arc<InFlight>) -> Self {
        in_flight.count.fetch_add(1, Ordering::SeqCst);
        Self(Arc::clone(in_flight))
    }
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        if self.0.count.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.0.idle.notify_waiters();
        }
    }
}

/// Table of pending delayed actions
pub struct Debouncer<K: Eq + Hash> {
    pending: Arc<DashMap<K, PendingAction>>,
    in_flight: Arc<InFlight>,
    next_generation: AtomicU64,
}

impl<K> Debouncer<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    pub fn new() -> Self {
        Self {
            pending: Arc::new(DashMap::new()),
            in_flight: Arc::new(InFlight::default()),
            next_generation: AtomicU64::new(0),
        }
    }

    /// Run `action` after `delay`, replacing anything pending for `key`.
    ///
    /// Must be called from within a tokio runtime.
    pub fn schedule<F>(&self, key: K, delay: Duration, action: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let generation = self.next_generation.fetch_add(1, Ordering::Relaxed);
        let pending = Arc::clone(&self.pending);
        let task_key = key.clone();
        let guard = InFlightGuard::enter(&self.in_flight);

        // hold the entry while spawning so the task can't clear it before it exists
        let entry = self.pending.entry(key);
        let handle = tokio::spawn(async move {
            let _guard = guard;
            tokio::time::sleep(delay).await;
            pending.remove_if(&task_key, |_, action| action.generation == generation);
            action.await;
        });
        let scheduled = PendingAction { generation, handle };

        match entry {
            Entry::Occupied(mut occupied) => {
                let previous = occupied.insert(scheduled);
                previous.handle.abort();
                debug!("rescheduled {:?}", occupied.key());
            }
            Entry::Vacant(vacant) => {
                vacant.insert(scheduled);
            }
        }
    }

    /// Abort the pending action for `key`. Returns true if there was one.
    pub fn cancel(&self, key: &K) -> bool {
        match self.pending.remove(key) {
            Some((_, action)) => {
                action.handle.abort();
                true
            }
            None => false,
        }
    }

    /// Abort every pending action
    pub fn cancel_all(&self) {
        self.pending.retain(|_, action| {
            action.handle.abort();
            false
        });
    }

    pub fn is_pending(&self, key: &K) -> bool {
        self.pending.contains_key(key)
    }

    /// Number of actions still waiting for their delay to elapse
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Number of actions that are either pending or still running
    pub fn in_flight(&self) -> usize {
        self.in_flight.count.load(Ordering::SeqCst)
    }

    /// Wait until no action is pending or running.
    ///
    /// Actions scheduled while waiting are waited for as well.
    pub async fn wait_idle(&self) {
        loop {
            let idle = self.in_flight.idle.notified();
            if self.in_flight() == 0 {
                return;
            }
            idle.await;
        }
    }
}

impl<K> Default for Debouncer<K>
where
    K: Eq + Hash + Clone + Debug + Send + Sync + 'static,
{
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicU32;

    #[tokio::test(start_paused = true)]
    async fn test_burst_runs_once() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicU32::new(0));
        let last = Arc::new(AtomicU32::new(0));

        for i in 1..=5 {
            let runs = Arc::clone(&runs);
            let last = Arc::clone(&last);
            debouncer.schedule("key", Duration::from_millis(250), async move {
                runs.fetch_add(1, Ordering::SeqCst);
                last.store(i, Ordering::SeqCst);
            });
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        assert_eq!(debouncer.pending(), 1);

        tokio::time::sleep(Duration::from_millis(300)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(last.load(Ordering::SeqCst), 5);
        assert_eq!(debouncer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_keys_are_independent() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicU32::new(0));

        for key in ["a", "b", "a"] {
            let runs = Arc::clone(&runs);
            debouncer.schedule(key, Duration::from_millis(100), async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(debouncer.pending(), 2);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel() {
        let debouncer = Debouncer::new();
        let runs = Arc::new(AtomicU32::new(0));

        for key in ["a", "b"] {
            let runs = Arc::clone(&runs);
            debouncer.schedule(key, Duration::from_millis(100), async move {
                runs.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert!(debouncer.cancel(&"a"));
        assert!(!debouncer.cancel(&"a"));
        assert!(debouncer.is_pending(&"b"));

        debouncer.cancel_all();
        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);
        assert_eq!(debouncer.pending(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_running_action_is_not_aborted() {
        let debouncer = Arc::new(Debouncer::new());
        let finished = Arc::new(AtomicU32::new(0));

        {
            let finished = Arc::clone(&finished);
            debouncer.schedule("key", Duration::from_millis(10), async move {
                tokio::time::sleep(Duration::from_millis(100)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        // the first action is mid-flight now
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!debouncer.is_pending(&"key"));

        {
            let finished = Arc::clone(&finished);
            debouncer.schedule("key", Duration::from_millis(10), async move {
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(finished.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_wait_idle_covers_running_actions() {
        let debouncer = Arc::new(Debouncer::new());
        let finished = Arc::new(AtomicU32::new(0));

        for key in ["a", "b"] {
            let finished = Arc::clone(&finished);
            debouncer.schedule(key, Duration::from_millis(10), async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }
        // replaced before its delay elapsed, must not be counted twice
        {
            let finished = Arc::clone(&finished);
            debouncer.schedule("a", Duration::from_millis(20), async move {
                tokio::time::sleep(Duration::from_millis(500)).await;
                finished.fetch_add(1, Ordering::SeqCst);
            });
        }

        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(debouncer.pending(), 0);
        assert_eq!(debouncer.in_flight(), 2);

        debouncer.wait_idle().await;
        assert_eq!(finished.load(Ordering::SeqCst), 2);
        assert_eq!(debouncer.in_flight(), 0);

        // nothing scheduled, returns right away
        debouncer.wait_idle().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_releases_in_flight() {
        let debouncer = Debouncer::new();
        debouncer.schedule("a", Duration::from_millis(100), async {});
        debouncer.schedule("b", Duration::from_millis(100), async {});
        debouncer.cancel_all();

        tokio::time::timeout(Duration::from_millis(10), debouncer.wait_idle())
            .await
            .expect("aborted actions still counted");
        assert_eq!(debouncer.in_flight(), 0);
    }
}
