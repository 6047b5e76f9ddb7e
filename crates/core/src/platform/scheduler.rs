use std::time::Duration;

/// Callback handed to a [`Scheduler`]; runs at most once.
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// Handle for a pending task, used to revoke it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord)]
pub struct TimerId(u64);

impl TimerId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub const fn get(self) -> u64 {
        self.0
    }
}

/// Host timer and display-frame scheduling.
pub trait Scheduler: Send + Sync {
    /// Runs `task` once `delay` has elapsed on the host clock.
    fn schedule_after(&self, delay: Duration, task: ScheduledTask) -> TimerId;

    /// Runs `task` before the next display frame is painted.
    fn schedule_frame(&self, task: ScheduledTask) -> TimerId;

    /// Revokes a pending task. Unknown or already executed ids are ignored.
    fn cancel(&self, id: TimerId);
}
