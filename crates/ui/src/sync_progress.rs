// crates/ui/src/sync_progress.rs
//! Bridges `SyncEngine::run`'s synchronous `on_progress` callback into a
//! `tokio::sync::watch` channel the render loop can subscribe to, the same
//! way `EditCoordinator::subscribe` exposes job progress as a broadcast
//! stream the UI polls rather than calling back into directly.

use tokio::sync::watch;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncProgress {
    pub done: usize,
    pub total: usize,
    pub status_line: String,
    pub finished: bool,
}

impl SyncProgress {
    pub fn starting() -> Self {
        Self { done: 0, total: 0, status_line: "starting sync".to_string(), finished: false }
    }
}

/// Paired with a `watch::Receiver<SyncProgress>` the UI holds onto across
/// the lifetime of one sync run. Call `report` from inside the closure
/// passed to `SyncEngine::run`; drop (or call `finish`) once it returns.
pub struct SyncProgressSender {
    tx: watch::Sender<SyncProgress>,
}

impl SyncProgressSender {
    pub fn channel() -> (Self, watch::Receiver<SyncProgress>) {
        let (tx, rx) = watch::channel(SyncProgress::starting());
        (Self { tx }, rx)
    }

    /// Shaped to match `SyncEngine::run`'s `FnMut(usize, usize, &str)`
    /// callback signature directly.
    pub fn report(&self, done: usize, total: usize, status_line: &str) {
        let _ = self.tx.send(SyncProgress {
            done,
            total,
            status_line: status_line.to_string(),
            finished: done == total && total > 0,
        });
    }

    pub fn finish(&self, status_line: impl Into<String>) {
        let current = self.tx.borrow().clone();
        let _ = self.tx.send(SyncProgress { finished: true, status_line: status_line.into(), ..current });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn report_marks_finished_once_done_reaches_total() {
        let (sender, rx) = SyncProgressSender::channel();
        sender.report(1, 3, "scanning acme #7");
        assert!(!rx.borrow().finished);
        sender.report(3, 3, "done");
        assert!(rx.borrow().finished);
    }

    #[test]
    fn finish_preserves_the_last_counts() {
        let (sender, rx) = SyncProgressSender::channel();
        sender.report(2, 5, "scanning");
        sender.finish("aborted: rate limited");
        let last = rx.borrow().clone();
        assert_eq!(last.done, 2);
        assert_eq!(last.total, 5);
        assert!(last.finished);
        assert_eq!(last.status_line, "aborted: rate limited");
    }
}
