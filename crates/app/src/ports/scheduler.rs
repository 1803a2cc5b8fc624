//! Scheduler port — one-shot timers with cancellable handles.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Duration;

use lumen_domain::id::TimerId;
use lumen_domain::time::Timestamp;

/// Effect run when a timer expires.
pub type TimerCallback = Box<dyn FnOnce()>;

/// Source of time and one-shot timers.
pub trait Scheduler {
    fn now(&self) -> Timestamp;

    /// Run `callback` once after `delay`, unless the returned handle is
    /// cancelled first.
    fn schedule_once(&self, delay: Duration, callback: TimerCallback) -> TimerHandle;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Pending,
    Fired,
    Cancelled,
}

/// Caller side of a scheduled timer.
///
/// Cancelling takes effect immediately: the scheduler checks the shared
/// phase right before running the callback, so a timer cancelled during an
/// earlier dispatch step can never fire.
#[derive(Debug)]
pub struct TimerHandle {
    id: TimerId,
    phase: Rc<Cell<Phase>>,
}

/// Scheduler side of a timer, paired with a [`TimerHandle`].
#[derive(Debug)]
pub struct TimerSlot {
    phase: Rc<Cell<Phase>>,
}

impl TimerHandle {
    /// Create a linked handle/slot pair for a new timer.
    #[must_use]
    pub fn pair() -> (Self, TimerSlot) {
        let phase = Rc::new(Cell::new(Phase::Pending));
        let handle = Self {
            id: TimerId::new(),
            phase: Rc::clone(&phase),
        };
        (handle, TimerSlot { phase })
    }

    #[must_use]
    pub fn id(&self) -> TimerId {
        self.id
    }

    /// Cancel the timer. Has no effect once it fired.
    pub fn cancel(&self) {
        if self.phase.get() == Phase::Pending {
            self.phase.set(Phase::Cancelled);
        }
    }

    #[must_use]
    pub fn is_pending(&self) -> bool {
        self.phase.get() == Phase::Pending
    }

    #[must_use]
    pub fn has_fired(&self) -> bool {
        self.phase.get() == Phase::Fired
    }
}

impl TimerSlot {
    /// Mark the timer as fired if it is still pending.
    ///
    /// Returns `false` when the timer was cancelled (or already fired), in
    /// which case the scheduler must drop the callback without running it.
    #[must_use]
    pub fn try_fire(&self) -> bool {
        if self.phase.get() == Phase::Pending {
            self.phase.set(Phase::Fired);
            true
        } else {
            false
        }
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.phase.get() == Phase::Cancelled
    }
}
