//! Deterministic manual-advance scheduler.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap};
use std::rc::Rc;

use super::{Scheduler, Task, TimerId};

/// Virtual time source.
///
/// Nothing happens until [`VirtualClock::advance_by`] or
/// [`VirtualClock::advance_to`] is called. Due tasks run in order of due
/// time, ties broken by scheduling order. Tasks scheduled while advancing
/// run in the same call if they fall due before the target time.
pub struct VirtualClock {
    inner: RefCell<ClockInner>,
}

#[derive(Default)]
struct ClockInner {
    now_ms: u64,
    next_id: u64,
    queue: BTreeMap<(u64, u64), Task>,
    due_by_id: HashMap<TimerId, u64>,
}

impl VirtualClock {
    pub fn new() -> Rc<Self> {
        Rc::new(Self {
            inner: RefCell::new(ClockInner::default()),
        })
    }

    pub fn advance_by(&self, ms: u64) {
        let target = self.now_ms() + ms;
        self.advance_to(target);
    }

    pub fn advance_to(&self, target_ms: u64) {
        while let Some(task) = self.pop_due(target_ms) {
            task();
        }
        let mut inner = self.inner.borrow_mut();
        inner.now_ms = inner.now_ms.max(target_ms);
    }

    /// Number of timers still waiting to fire.
    pub fn pending(&self) -> usize {
        self.inner.borrow().queue.len()
    }

    // The borrow is released before the task runs so tasks can schedule more.
    fn pop_due(&self, target_ms: u64) -> Option<Task> {
        let mut inner = self.inner.borrow_mut();
        let ready = inner
            .queue
            .first_key_value()
            .is_some_and(|(&(due, _), _)| due <= target_ms);
        if !ready {
            return None;
        }
        let ((due, seq), task) = inner.queue.pop_first()?;
        inner.due_by_id.remove(&TimerId(seq));
        inner.now_ms = inner.now_ms.max(due);
        Some(task)
    }
}

impl Scheduler for VirtualClock {
    fn now_ms(&self) -> u64 {
        self.inner.borrow().now_ms
    }

    fn set_timeout(&self, delay_ms: u32, task: Task) -> TimerId {
        let mut inner = self.inner.borrow_mut();
        let seq = inner.next_id;
        inner.next_id += 1;
        let due = inner.now_ms + u64::from(delay_ms);
        let id = TimerId(seq);
        inner.queue.insert((due, seq), task);
        inner.due_by_id.insert(id, due);
        id
    }

    fn clear_timeout(&self, id: TimerId) {
        let mut inner = self.inner.borrow_mut();
        if let Some(due) = inner.due_by_id.remove(&id) {
            inner.queue.remove(&(due, id.0));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    #[test]
    fn runs_tasks_in_due_order() {
        let clock = VirtualClock::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        for (delay, label) in [(30, "c"), (10, "a"), (20, "b"), (10, "a2")] {
            let log = log.clone();
            clock.set_timeout(delay, Box::new(move || log.borrow_mut().push(label)));
        }

        clock.advance_by(15);
        assert_eq!(*log.borrow(), vec!["a", "a2"]);
        assert_eq!(clock.now_ms(), 15);

        clock.advance_by(100);
        assert_eq!(*log.borrow(), vec!["a", "a2", "b", "c"]);
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn cleared_timer_never_fires() {
        let clock = VirtualClock::new();
        let fired = Rc::new(RefCell::new(false));
        let flag = fired.clone();
        let id = clock.set_timeout(5, Box::new(move || *flag.borrow_mut() = true));

        clock.clear_timeout(id);
        clock.clear_timeout(id);
        clock.advance_by(10);

        assert!(!*fired.borrow());
    }

    #[test]
    fn tasks_scheduled_while_advancing_run_if_due() {
        let clock = VirtualClock::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let inner_clock = clock.clone();
        let inner_log = log.clone();
        clock.set_timeout(
            10,
            Box::new(move || {
                inner_log.borrow_mut().push(inner_clock.now_ms());
                let log = inner_log.clone();
                let clock = inner_clock.clone();
                inner_clock.set_timeout(5, Box::new(move || log.borrow_mut().push(clock.now_ms())));
            }),
        );

        clock.advance_to(20);
        assert_eq!(*log.borrow(), vec![10, 15]);
        assert_eq!(clock.now_ms(), 20);
    }
}
