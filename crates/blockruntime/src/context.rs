use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

/// Shared state of one run: the only data touched by every block task.
///
/// `remaining` counts blocks that have not reached `Done` or `Failed`;
/// `failed` flips once, on the first failure, and never resets.
#[derive(Debug)]
pub struct RunContext {
    remaining: AtomicUsize,
    in_flight: AtomicUsize,
    failed: AtomicBool,
    changed: Notify,
    cancel: CancellationToken,
}

impl RunContext {
    pub fn new(total_blocks: usize) -> Self {
        Self {
            remaining: AtomicUsize::new(total_blocks),
            in_flight: AtomicUsize::new(0),
            failed: AtomicBool::new(false),
            changed: Notify::new(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn remaining(&self) -> usize {
        self.remaining.load(Ordering::Acquire)
    }

    pub fn is_failed(&self) -> bool {
        self.failed.load(Ordering::Acquire)
    }

    /// Dispatched block tasks that have not returned yet
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::Acquire)
    }

    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Record a block reaching a terminal state. Saturates at zero.
    pub fn complete_one(&self) {
        let _ = self
            .remaining
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| n.checked_sub(1));
        self.changed.notify_waiters();
    }

    /// Set the failure flag. Returns true only for the call that set it.
    pub fn mark_failed(&self) -> bool {
        let first = self
            .failed
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_ok();
        self.changed.notify_waiters();
        first
    }

    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    pub(crate) fn task_started(&self) {
        self.in_flight.fetch_add(1, Ordering::AcqRel);
    }

    pub(crate) fn task_finished(&self) {
        self.in_flight.fetch_sub(1, Ordering::AcqRel);
        self.changed.notify_waiters();
    }

    /// Block until every block finished or any block failed
    pub async fn wait_drained_or_failed(&self) {
        self.wait_until(|ctx| ctx.remaining() == 0 || ctx.is_failed())
            .await
    }

    /// Block until no dispatched task is still running
    pub async fn wait_idle(&self) {
        self.wait_until(|ctx| ctx.in_flight() == 0).await
    }

    async fn wait_until(&self, done: impl Fn(&Self) -> bool) {
        loop {
            let notified = self.changed.notified();
            tokio::pin!(notified);
            // Register before checking so a signal between the check and
            // the await is not lost.
            notified.as_mut().enable();
            if done(self) {
                return;
            }
            notified.await;
        }
    }
}
