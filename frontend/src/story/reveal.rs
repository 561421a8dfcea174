//! Typewriter and scattered-word reveals.
//!
//! A reveal walks a string one unit at a time on a fixed cadence. Units are
//! characters, or whitespace-separated words with an explicit single-space
//! unit between them. Each tick is scheduled only after the previous one
//! ran, so ticks of one reveal are strictly ordered.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::timeline::TaskScope;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    #[default]
    Character,
    Word,
}

#[derive(Clone, Debug, PartialEq)]
pub struct RevealSpec {
    pub text: String,
    pub unit_delay_ms: u32,
    pub start_delay_ms: u32,
    pub granularity: Granularity,
}

impl RevealSpec {
    pub fn characters(text: impl Into<String>, unit_delay_ms: u32) -> Self {
        Self {
            text: text.into(),
            unit_delay_ms,
            start_delay_ms: 0,
            granularity: Granularity::Character,
        }
    }

    pub fn words(text: impl Into<String>, unit_delay_ms: u32) -> Self {
        Self {
            granularity: Granularity::Word,
            ..Self::characters(text, unit_delay_ms)
        }
    }

    pub fn after(mut self, start_delay_ms: u32) -> Self {
        self.start_delay_ms = start_delay_ms;
        self
    }
}

/// Progress of one revealed text element.
///
/// `revealed_len` counts characters of `source_text`. In word mode the
/// source is the whitespace-normalized text (words joined by one space) so
/// the prefix always renders exactly as emitted.
#[derive(Clone, Debug, PartialEq)]
pub struct RevealState {
    source_text: Rc<str>,
    revealed_len: usize,
    total_len: usize,
    units_shown: usize,
}

impl RevealState {
    fn new(source_text: Rc<str>) -> Self {
        let total_len = source_text.chars().count();
        Self {
            source_text,
            revealed_len: 0,
            total_len,
            units_shown: 0,
        }
    }

    /// Fully revealed state, for text shown without animation.
    pub fn complete(text: &str) -> Self {
        let mut state = Self::new(Rc::from(text));
        state.revealed_len = state.total_len;
        state
    }

    pub fn source_text(&self) -> &str {
        &self.source_text
    }

    pub fn revealed_len(&self) -> usize {
        self.revealed_len
    }

    pub fn is_complete(&self) -> bool {
        self.revealed_len == self.total_len
    }

    pub fn visible(&self) -> &str {
        match self.source_text.char_indices().nth(self.revealed_len) {
            Some((byte, _)) => &self.source_text[..byte],
            None => &self.source_text,
        }
    }
}

/// Splits text into reveal units and returns the normalized source text
/// with the cumulative character length after each unit.
fn unit_boundaries(text: &str, granularity: Granularity) -> (Rc<str>, Vec<usize>) {
    match granularity {
        Granularity::Character => {
            let ends = (1..=text.chars().count()).collect();
            (Rc::from(text), ends)
        }
        Granularity::Word => {
            let mut normalized = String::with_capacity(text.len());
            let mut ends = Vec::new();
            let mut len = 0;
            for (i, word) in text.split_whitespace().enumerate() {
                if i > 0 {
                    normalized.push(' ');
                    len += 1;
                    ends.push(len);
                }
                normalized.push_str(word);
                len += word.chars().count();
                ends.push(len);
            }
            (Rc::from(normalized), ends)
        }
    }
}

type UpdateFn = Box<dyn FnMut(&RevealState)>;
type CompleteFn = Box<dyn FnOnce(&RevealState)>;

struct RevealRun {
    state: RevealState,
    ends: Vec<usize>,
    unit_delay_ms: u32,
    on_update: Option<UpdateFn>,
    on_complete: Option<CompleteFn>,
}

/// Handle to a scheduled reveal. Dropping it does not stop the reveal;
/// cancelling it (or its parent scope) does.
#[derive(Clone)]
pub struct RevealHandle {
    scope: TaskScope,
    run: Rc<RefCell<RevealRun>>,
}

impl RevealHandle {
    /// Starts a reveal inside `parent`.
    ///
    /// `on_update` sees every partial state including the final one;
    /// `on_complete` runs once, right after the final update. Empty text
    /// completes synchronously without any update.
    pub fn schedule<U, C>(
        parent: &TaskScope,
        spec: RevealSpec,
        on_update: U,
        on_complete: C,
    ) -> Self
    where
        U: FnMut(&RevealState) + 'static,
        C: FnOnce(&RevealState) + 'static,
    {
        let (source, ends) = unit_boundaries(&spec.text, spec.granularity);
        let handle = Self {
            scope: parent.child(),
            run: Rc::new(RefCell::new(RevealRun {
                state: RevealState::new(source),
                ends,
                unit_delay_ms: spec.unit_delay_ms,
                on_update: Some(Box::new(on_update)),
                on_complete: Some(Box::new(on_complete)),
            })),
        };

        if handle.run.borrow().ends.is_empty() {
            handle.finish();
            return handle;
        }

        let first_delay = spec.start_delay_ms.saturating_add(spec.unit_delay_ms);
        let next = handle.clone();
        handle.scope.spawn_after(first_delay, move || next.tick());
        handle
    }

    pub fn cancel(&self) {
        self.scope.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.scope.is_cancelled()
    }

    pub fn state(&self) -> RevealState {
        self.run.borrow().state.clone()
    }

    fn tick(&self) {
        let (snapshot, done, delay) = {
            let mut run = self.run.borrow_mut();
            let unit = run.state.units_shown;
            let Some(&end) = run.ends.get(unit) else {
                return;
            };
            run.state.units_shown = unit + 1;
            run.state.revealed_len = end;
            (run.state.clone(), run.state.units_shown == run.ends.len(), run.unit_delay_ms)
        };

        // Callbacks run without the borrow held so they may query the handle.
        let update = self.run.borrow_mut().on_update.take();
        if let Some(mut update) = update {
            update(&snapshot);
            self.run.borrow_mut().on_update = Some(update);
        }

        if done {
            self.finish();
        } else {
            let next = self.clone();
            self.scope.spawn_after(delay, move || next.tick());
        }
    }

    fn finish(&self) {
        if self.scope.is_cancelled() {
            return;
        }
        let (snapshot, complete) = {
            let mut run = self.run.borrow_mut();
            run.on_update = None;
            (run.state.clone(), run.on_complete.take())
        };
        if let Some(complete) = complete {
            complete(&snapshot);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::VirtualClock;
    use std::cell::Cell;

    struct Recorder {
        updates: Rc<RefCell<Vec<String>>>,
        completions: Rc<RefCell<Vec<usize>>>,
    }

    impl Recorder {
        fn new() -> Self {
            Self {
                updates: Rc::new(RefCell::new(Vec::new())),
                completions: Rc::new(RefCell::new(Vec::new())),
            }
        }

        fn start(&self, scope: &TaskScope, spec: RevealSpec) -> RevealHandle {
            let updates = self.updates.clone();
            let completions = self.completions.clone();
            RevealHandle::schedule(
                scope,
                spec,
                move |s| updates.borrow_mut().push(s.visible().to_string()),
                move |s| completions.borrow_mut().push(s.revealed_len()),
            )
        }
    }

    #[test]
    fn empty_text_completes_immediately() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let rec = Recorder::new();

        let handle = rec.start(&scope, RevealSpec::characters("", 50).after(500));

        assert!(rec.updates.borrow().is_empty());
        assert_eq!(*rec.completions.borrow(), vec![0]);
        assert!(handle.state().is_complete());
        assert_eq!(clock.pending(), 0);
    }

    #[test]
    fn reveals_characters_on_cadence() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let rec = Recorder::new();

        rec.start(&scope, RevealSpec::characters("Hi", 50));

        clock.advance_to(49);
        assert!(rec.updates.borrow().is_empty());
        clock.advance_to(50);
        assert_eq!(*rec.updates.borrow(), vec!["H"]);
        assert!(rec.completions.borrow().is_empty());
        clock.advance_to(100);
        assert_eq!(*rec.updates.borrow(), vec!["H", "Hi"]);
        assert_eq!(*rec.completions.borrow(), vec![2]);

        clock.advance_by(1_000);
        assert_eq!(rec.updates.borrow().len(), 2);
        assert_eq!(rec.completions.borrow().len(), 1);
    }

    #[test]
    fn cancel_mid_sequence_stops_everything() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let rec = Recorder::new();

        let handle = rec.start(&scope, RevealSpec::characters("Hi", 50));
        clock.advance_to(60);
        handle.cancel();
        handle.cancel();
        clock.advance_by(1_000);

        assert_eq!(*rec.updates.borrow(), vec!["H"]);
        assert!(rec.completions.borrow().is_empty());
        assert_eq!(handle.state().visible(), "H");
        assert!(!handle.state().is_complete());
    }

    #[test]
    fn honors_start_delay() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let rec = Recorder::new();

        rec.start(&scope, RevealSpec::characters("ok", 75).after(800));
        clock.advance_to(874);
        assert!(rec.updates.borrow().is_empty());
        clock.advance_to(875);
        assert_eq!(*rec.updates.borrow(), vec!["o"]);
    }

    #[test]
    fn word_mode_inserts_space_units() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let rec = Recorder::new();

        let handle = rec.start(&scope, RevealSpec::words("  be   mine  ", 10));
        clock.advance_by(100);

        assert_eq!(*rec.updates.borrow(), vec!["be", "be ", "be mine"]);
        assert_eq!(handle.state().source_text(), "be mine");
        assert_eq!(*rec.completions.borrow(), vec![7]);
    }

    #[test]
    fn counts_characters_not_bytes() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let rec = Recorder::new();

        let handle = rec.start(&scope, RevealSpec::characters("a💓", 10));
        clock.advance_by(10);
        assert_eq!(handle.state().visible(), "a");
        clock.advance_by(10);
        assert_eq!(*rec.updates.borrow(), vec!["a", "a💓"]);
        assert_eq!(handle.state().revealed_len(), 2);
    }

    #[test]
    fn parent_scope_teardown_stops_reveal() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let rec = Recorder::new();

        rec.start(&scope, RevealSpec::characters("hello", 10));
        clock.advance_by(20);
        scope.cancel();
        clock.advance_by(100);

        assert_eq!(rec.updates.borrow().len(), 2);
        assert!(rec.completions.borrow().is_empty());
    }

    #[test]
    fn update_callback_can_read_handle_state() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let slot: Rc<RefCell<Option<RevealHandle>>> = Rc::new(RefCell::new(None));
        let seen = Rc::new(Cell::new(0));

        let reader = slot.clone();
        let counter = seen.clone();
        let handle = RevealHandle::schedule(
            &scope,
            RevealSpec::characters("abc", 5),
            move |_| {
                if let Some(h) = reader.borrow().as_ref() {
                    counter.set(h.state().revealed_len());
                }
            },
            |_| {},
        );
        *slot.borrow_mut() = Some(handle);

        clock.advance_by(15);
        assert_eq!(seen.get(), 3);
    }

    #[test]
    fn cancelling_from_final_update_suppresses_completion() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let completed = Rc::new(Cell::new(false));
        let done = completed.clone();
        let owner = scope.clone();

        RevealHandle::schedule(
            &scope,
            RevealSpec::characters("x", 5),
            move |_| owner.cancel(),
            move |_| done.set(true),
        );
        clock.advance_by(10);

        assert!(!completed.get());
    }
}
