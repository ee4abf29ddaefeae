//! Completion tracking for one pipeline direction.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tokio::sync::Notify;

/// Counts items a direction expects and items it has finished.
///
/// Every item ends exactly once: executed, dropped by the decoder, or skipped
/// because its payload vanished. The total is raised before items are
/// dispatched, so [`wait_drained`](Self::wait_drained) never fires early.
///
/// A cycle starts with the first announcement after the direction drained;
/// [`elapsed`](Self::elapsed) measures the current cycle.
#[derive(Debug)]
pub struct Progress {
    total: AtomicUsize,
    done: AtomicUsize,
    notify: Notify,
    cycle_started: Mutex<Instant>,
}

impl Progress {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            total: AtomicUsize::new(0),
            done: AtomicUsize::new(0),
            notify: Notify::new(),
            cycle_started: Mutex::new(Instant::now()),
        })
    }

    /// Announce `n` more items.
    pub fn announce(&self, n: usize) {
        if n == 0 {
            return;
        }
        if self.is_drained() {
            *self.lock_cycle() = Instant::now();
        }
        self.total.fetch_add(n, Ordering::SeqCst);
    }

    /// Mark `n` items finished.
    pub fn complete(&self, n: usize) {
        if n == 0 {
            return;
        }
        self.done.fetch_add(n, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    pub fn total(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }

    pub fn done(&self) -> usize {
        self.done.load(Ordering::SeqCst)
    }

    pub fn is_drained(&self) -> bool {
        self.done() >= self.total()
    }

    /// Time since the current cycle started.
    pub fn elapsed(&self) -> Duration {
        self.lock_cycle().elapsed()
    }

    fn lock_cycle(&self) -> MutexGuard<'_, Instant> {
        self.cycle_started
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Wait until every announced item is finished and more than `seen`
    /// items were announced in total. Returns the total.
    ///
    /// `None` accepts any total, including zero.
    pub async fn wait_drained(&self, seen: Option<usize>) -> usize {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            let total = self.total();
            let ready = self.done() >= total && seen.map_or(true, |seen| total > seen);
            if ready {
                return total;
            }
            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn test_drained_only_at_total(parts in prop::collection::vec(1usize..50, 1..20)) {
            let total: usize = parts.iter().sum();
            let progress = Progress::new();
            progress.announce(total);

            let mut done = 0;
            for part in parts {
                prop_assert!(!progress.is_drained());
                progress.complete(part);
                done += part;
                prop_assert_eq!(progress.done(), done);
            }
            prop_assert!(progress.is_drained());
        }
    }

    #[tokio::test]
    async fn test_empty_is_drained() {
        let progress = Progress::new();
        assert_eq!(progress.wait_drained(None).await, 0);
    }

    #[tokio::test]
    async fn test_wait_until_complete() {
        let progress = Progress::new();
        progress.announce(3);

        let waiter = {
            let progress = progress.clone();
            tokio::spawn(async move { progress.wait_drained(None).await })
        };

        progress.complete(1);
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        progress.complete(2);
        assert_eq!(waiter.await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_wait_for_more_than_seen() {
        let progress = Progress::new();
        progress.announce(2);
        progress.complete(2);

        let waiter = {
            let progress = progress.clone();
            tokio::spawn(async move { progress.wait_drained(Some(2)).await })
        };
        tokio::task::yield_now().await;
        assert!(!waiter.is_finished());

        progress.announce(1);
        progress.complete(1);
        assert_eq!(waiter.await.unwrap(), 3);
    }

    #[test]
    fn test_elapsed_restarts_with_new_cycle() {
        let progress = Progress::new();
        progress.announce(2);
        progress.complete(1);
        std::thread::sleep(Duration::from_millis(40));

        // still busy, same cycle
        progress.announce(1);
        assert!(progress.elapsed() >= Duration::from_millis(40));

        progress.complete(2);
        progress.announce(1);
        assert!(progress.elapsed() < Duration::from_millis(40));
    }
}
