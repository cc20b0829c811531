//! Counting barrier for outstanding units of work.

use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Notify;
use tracing::warn;

/// Counts outstanding workers and wakes waiters when the count reaches zero.
#[derive(Debug, Default)]
pub struct CompletionTracker {
    outstanding: AtomicUsize,
    notify: Notify,
}

impl CompletionTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `n` more outstanding units. Call before launching them.
    pub fn add(&self, n: usize) {
        self.outstanding.fetch_add(n, Ordering::AcqRel);
    }

    /// Marks one unit as finished.
    ///
    /// Extra calls once the count is already zero are ignored.
    pub fn done(&self) {
        let previous = self
            .outstanding
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));

        match previous {
            Ok(1) => self.notify.notify_waiters(),
            Ok(_) => {}
            Err(_) => warn!("CompletionTracker::done called with no outstanding units"),
        }
    }

    /// Number of units still running.
    pub fn outstanding(&self) -> usize {
        self.outstanding.load(Ordering::Acquire)
    }

    /// Waits until no units are outstanding. Returns immediately if none are.
    pub async fn wait(&self) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register before checking so a notification between the check
            // and the await is not lost.
            notified.as_mut().enable();

            if self.outstanding() == 0 {
                return;
            }

            notified.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    #[tokio::test]
    async fn test_wait_with_nothing_outstanding() {
        let tracker = CompletionTracker::new();
        tokio::time::timeout(Duration::from_millis(100), tracker.wait())
            .await
            .expect("wait should return immediately");
    }

    #[tokio::test]
    async fn test_wait_blocks_until_all_done() {
        let tracker = Arc::new(CompletionTracker::new());
        tracker.add(3);

        for delay in [10u64, 30, 20] {
            let tracker = Arc::clone(&tracker);
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(delay)).await;
                tracker.done();
            });
        }

        tracker.wait().await;
        assert_eq!(tracker.outstanding(), 0);
    }

    #[tokio::test]
    async fn test_wait_still_pending() {
        let tracker = CompletionTracker::new();
        tracker.add(1);

        let result = tokio::time::timeout(Duration::from_millis(50), tracker.wait()).await;
        assert!(result.is_err());
        assert_eq!(tracker.outstanding(), 1);
    }

    #[test]
    fn test_done_does_not_underflow() {
        let tracker = CompletionTracker::new();
        tracker.done();
        assert_eq!(tracker.outstanding(), 0);

        tracker.add(2);
        tracker.done();
        assert_eq!(tracker.outstanding(), 1);
    }
}
