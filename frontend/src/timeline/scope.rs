//! Structured ownership of timers.

use std::cell::{Cell, RefCell};
use std::collections::HashSet;
use std::rc::{Rc, Weak};

use tracing::debug;

use super::{Scheduler, TimerId};

/// Owns every timer spawned through it, plus any child scopes.
///
/// Cancelling a scope clears its pending timers and cancels its children;
/// after that no task spawned through the scope (or a child) will run.
/// Cancellation is idempotent and also happens when the last handle to the
/// scope is dropped.
#[derive(Clone)]
pub struct TaskScope {
    inner: Rc<ScopeInner>,
}

struct ScopeInner {
    scheduler: Rc<dyn Scheduler>,
    state: RefCell<ScopeState>,
}

#[derive(Default)]
struct ScopeState {
    cancelled: bool,
    timers: HashSet<TimerId>,
    children: Vec<TaskScope>,
}

impl TaskScope {
    pub fn new(scheduler: Rc<dyn Scheduler>) -> Self {
        Self {
            inner: Rc::new(ScopeInner {
                scheduler,
                state: RefCell::new(ScopeState::default()),
            }),
        }
    }

    /// New scope cancelled together with this one. A child of a cancelled
    /// scope starts out cancelled.
    pub fn child(&self) -> TaskScope {
        let child = TaskScope::new(self.inner.scheduler.clone());
        let mut state = self.inner.state.borrow_mut();
        if state.cancelled {
            child.inner.state.borrow_mut().cancelled = true;
        } else {
            state.children.retain(|c| !c.is_cancelled());
            state.children.push(child.clone());
        }
        child
    }

    pub fn now_ms(&self) -> u64 {
        self.inner.scheduler.now_ms()
    }

    pub fn is_cancelled(&self) -> bool {
        self.inner.state.borrow().cancelled
    }

    /// Runs `task` after `delay_ms` unless the scope is cancelled first.
    /// Returns `None` when the scope is already cancelled.
    pub fn spawn_after<F>(&self, delay_ms: u32, task: F) -> Option<TimerId>
    where
        F: FnOnce() + 'static,
    {
        if self.is_cancelled() {
            return None;
        }

        let weak: Weak<ScopeInner> = Rc::downgrade(&self.inner);
        let slot = Rc::new(Cell::new(None::<TimerId>));
        let own_id = slot.clone();

        let id = self.inner.scheduler.set_timeout(
            delay_ms,
            Box::new(move || {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                {
                    let mut state = inner.state.borrow_mut();
                    if state.cancelled {
                        return;
                    }
                    if let Some(id) = own_id.get() {
                        state.timers.remove(&id);
                    }
                }
                task();
            }),
        );

        slot.set(Some(id));
        self.inner.state.borrow_mut().timers.insert(id);
        Some(id)
    }

    pub fn cancel(&self) {
        self.inner.cancel();
    }

    /// Timers spawned directly through this scope that have not fired yet.
    #[cfg(test)]
    pub fn pending(&self) -> usize {
        self.inner.state.borrow().timers.len()
    }
}

impl ScopeInner {
    fn cancel(&self) {
        let (timers, children) = {
            let mut state = self.state.borrow_mut();
            if state.cancelled {
                return;
            }
            state.cancelled = true;
            (
                std::mem::take(&mut state.timers),
                std::mem::take(&mut state.children),
            )
        };

        debug!(timers = timers.len(), children = children.len(), "cancelling task scope");
        for id in timers {
            self.scheduler.clear_timeout(id);
        }
        for child in children {
            child.cancel();
        }
    }
}

impl Drop for ScopeInner {
    fn drop(&mut self) {
        self.cancel();
    }
}
