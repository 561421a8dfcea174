//! Cooperative timer plumbing shared by every scene.
//!
//! All timed behavior (reveal ticks, caption holds, confetti bursts) goes
//! through a [`Scheduler`], and every timer is owned by a [`TaskScope`] so
//! that tearing a scene down cancels everything it started. In the browser
//! the scheduler is backed by `gloo-timers`; in tests a `clock::VirtualClock`
//! is advanced by hand.

pub mod browser;
#[cfg(test)]
pub mod clock;
pub mod scope;

pub use browser::BrowserScheduler;
#[cfg(test)]
pub use clock::VirtualClock;
pub use scope::TaskScope;

use std::rc::Rc;

/// A deferred unit of work. Runs at most once.
pub type Task = Box<dyn FnOnce()>;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TimerId(pub u64);

/// Single-threaded timer queue. Tasks never run re-entrantly inside
/// `set_timeout`; they always run from the host's queue later on.
pub trait Scheduler {
    /// Milliseconds since the scheduler's origin.
    fn now_ms(&self) -> u64;

    fn set_timeout(&self, delay_ms: u32, task: Task) -> TimerId;

    /// Clearing an unknown or already fired timer is a no-op.
    fn clear_timeout(&self, id: TimerId);
}

/// Shared scheduler handle that can travel through Yew props and contexts.
#[derive(Clone)]
pub struct SchedulerHandle(pub Rc<dyn Scheduler>);

impl SchedulerHandle {
    pub fn browser() -> Self {
        Self(BrowserScheduler::new())
    }

    pub fn scope(&self) -> TaskScope {
        TaskScope::new(self.0.clone())
    }
}

impl PartialEq for SchedulerHandle {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}
