use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use gloo_timers::callback::Timeout;

use super::{Scheduler, Task, TimerId};

/// Scheduler on top of the browser's `setTimeout` queue.
///
/// Pending `Timeout`s are kept alive in a map; dropping one cancels it, so
/// `clear_timeout` is just a removal. A fired `Timeout` must not be dropped
/// from inside its own callback, so fired ids are parked in `fired` and
/// swept on the next call into the scheduler.
pub struct BrowserScheduler {
    this: Weak<BrowserScheduler>,
    next_id: Cell<u64>,
    pending: RefCell<HashMap<TimerId, Timeout>>,
    fired: RefCell<Vec<TimerId>>,
    origin_ms: f64,
}

impl BrowserScheduler {
    pub fn new() -> Rc<Self> {
        Rc::new_cyclic(|this| Self {
            this: this.clone(),
            next_id: Cell::new(0),
            pending: RefCell::new(HashMap::new()),
            fired: RefCell::new(Vec::new()),
            origin_ms: performance_now(),
        })
    }

    fn sweep_fired(&self) {
        let fired: Vec<TimerId> = self.fired.borrow_mut().drain(..).collect();
        if fired.is_empty() {
            return;
        }
        let mut pending = self.pending.borrow_mut();
        for id in fired {
            pending.remove(&id);
        }
    }
}

fn performance_now() -> f64 {
    web_sys::window()
        .and_then(|window| window.performance())
        .map(|performance| performance.now())
        .unwrap_or(0.0)
}

impl Scheduler for BrowserScheduler {
    fn now_ms(&self) -> u64 {
        (performance_now() - self.origin_ms).max(0.0) as u64
    }

    fn set_timeout(&self, delay_ms: u32, task: Task) -> TimerId {
        self.sweep_fired();

        let id = TimerId(self.next_id.get());
        self.next_id.set(id.0 + 1);

        let this = self.this.clone();
        let timeout = Timeout::new(delay_ms, move || {
            task();
            if let Some(scheduler) = this.upgrade() {
                scheduler.fired.borrow_mut().push(id);
            }
        });
        self.pending.borrow_mut().insert(id, timeout);
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        self.sweep_fired();
        // Dropping the handle clears the underlying browser timer.
        let removed = self.pending.borrow_mut().remove(&id);
        drop(removed);
    }
}
