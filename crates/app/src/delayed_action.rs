//! Delayed action token — a cancellable one-shot scheduled effect.

use std::time::Duration;

use lumen_domain::id::TimerId;

use crate::ports::{Scheduler, TimerHandle};

/// One outstanding scheduled effect.
///
/// Dropping the token cancels it, so replacing the token stored for a key
/// invalidates the previous one in the same step.
#[derive(Debug)]
pub struct DelayedAction {
    handle: TimerHandle,
}

impl DelayedAction {
    /// Schedule `effect` to run once after `delay`.
    pub fn schedule(
        scheduler: &dyn Scheduler,
        delay: Duration,
        effect: impl FnOnce() + 'static,
    ) -> Self {
        Self {
            handle: scheduler.schedule_once(delay, Box::new(effect)),
        }
    }

    #[must_use]
    pub fn id(&self) -> TimerId {
        self.handle.id()
    }

    pub fn cancel(&self) {
        self.handle.cancel();
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.handle.is_pending()
    }
}

impl Drop for DelayedAction {
    fn drop(&mut self) {
        if self.handle.is_pending() {
            tracing::trace!(timer = %self.id(), "delayed action dropped while pending");
        }
        self.handle.cancel();
    }
}
