use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};
use tracing::debug;

use super::Listener;
use crate::story::reveal::{Granularity, RevealHandle, RevealSpec, RevealState};
use crate::timeline::TaskScope;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "kind")]
pub enum CaptionStyle {
    /// Each caption is revealed unit by unit.
    Typed { unit_delay_ms: u32, granularity: Granularity },
    /// Each caption appears whole.
    Held,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContinueMode {
    /// Show a continue control and wait for a click.
    #[default]
    Prompt,
    /// Move on by itself.
    Auto,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CaptionTiming {
    pub style: CaptionStyle,
    /// Wait after a caption is fully shown before the next one starts.
    pub pause_ms: u32,
    /// Wait after the last caption before prompting (or moving on).
    pub prompt_pause_ms: u32,
}

#[derive(Clone, Debug, PartialEq)]
pub struct CaptionView {
    /// Index of the caption currently on screen.
    pub index: usize,
    pub current: RevealState,
    pub show_continue: bool,
}

struct CaptionState {
    captions: Vec<String>,
    timing: CaptionTiming,
    mode: ContinueMode,
    view: CaptionView,
    listener: Listener<CaptionView>,
    on_finished: Rc<dyn Fn()>,
}

/// An ordered run of captions, one at a time, ending in a continue prompt.
#[derive(Clone)]
pub struct CaptionSequence {
    scope: TaskScope,
    state: Rc<RefCell<CaptionState>>,
}

impl CaptionSequence {
    pub fn start(
        scope: &TaskScope,
        captions: Vec<String>,
        timing: CaptionTiming,
        mode: ContinueMode,
        listener: impl Fn(&CaptionView) + 'static,
        on_finished: impl Fn() + 'static,
    ) -> Self {
        let sequence = Self {
            scope: scope.child(),
            state: Rc::new(RefCell::new(CaptionState {
                captions,
                timing,
                mode,
                view: CaptionView {
                    index: 0,
                    current: RevealState::complete(""),
                    show_continue: false,
                },
                listener: Rc::new(listener),
                on_finished: Rc::new(on_finished),
            })),
        };

        if sequence.state.borrow().captions.is_empty() {
            sequence.after_last();
        } else {
            sequence.show(0);
        }
        sequence
    }

    #[cfg(test)]
    pub fn view(&self) -> CaptionView {
        self.state.borrow().view.clone()
    }

    pub fn cancel(&self) {
        self.scope.cancel();
    }

    fn show(&self, index: usize) {
        let (text, style) = {
            let state = self.state.borrow();
            (state.captions[index].clone(), state.timing.style)
        };
        debug!(index, "caption");

        match style {
            CaptionStyle::Held => {
                self.publish(|view| {
                    view.index = index;
                    view.current = RevealState::complete(&text);
                });
                self.caption_done(index);
            }
            CaptionStyle::Typed { unit_delay_ms, granularity } => {
                let spec = RevealSpec {
                    text,
                    unit_delay_ms,
                    start_delay_ms: 0,
                    granularity,
                };
                self.publish(|view| {
                    view.index = index;
                    view.current = RevealState::complete("");
                });
                let on_tick = self.clone();
                let on_done = self.clone();
                RevealHandle::schedule(
                    &self.scope,
                    spec,
                    move |reveal| on_tick.publish(|view| view.current = reveal.clone()),
                    move |reveal| {
                        on_done.publish(|view| view.current = reveal.clone());
                        on_done.caption_done(index);
                    },
                );
            }
        }
    }

    fn caption_done(&self, index: usize) {
        let (count, timing) = {
            let state = self.state.borrow();
            (state.captions.len(), state.timing)
        };
        if index + 1 < count {
            let next = self.clone();
            self.scope.spawn_after(timing.pause_ms, move || next.show(index + 1));
        } else {
            self.after_last();
        }
    }

    fn after_last(&self) {
        let pause = self.state.borrow().timing.prompt_pause_ms;
        let next = self.clone();
        self.scope.spawn_after(pause, move || next.finish());
    }

    fn finish(&self) {
        let (mode, on_finished) = {
            let state = self.state.borrow();
            (state.mode, state.on_finished.clone())
        };
        match mode {
            ContinueMode::Prompt => self.publish(|view| view.show_continue = true),
            ContinueMode::Auto => on_finished(),
        }
    }

    fn publish(&self, change: impl FnOnce(&mut CaptionView)) {
        if self.scope.is_cancelled() {
            return;
        }
        let (view, listener) = {
            let mut state = self.state.borrow_mut();
            change(&mut state.view);
            (state.view.clone(), state.listener.clone())
        };
        listener(&view);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::timeline::VirtualClock;
    use std::cell::Cell;

    fn lines(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn typed() -> CaptionTiming {
        CaptionTiming {
            style: CaptionStyle::Typed {
                unit_delay_ms: 100,
                granularity: Granularity::Character,
            },
            pause_ms: 2000,
            prompt_pause_ms: 1000,
        }
    }

    fn held() -> CaptionTiming {
        CaptionTiming {
            style: CaptionStyle::Held,
            pause_ms: 1800,
            prompt_pause_ms: 1500,
        }
    }

    #[test]
    fn typed_captions_then_prompt() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let finished = Rc::new(Cell::new(false));
        let flag = finished.clone();

        let seq = CaptionSequence::start(
            &scope,
            lines(&["ab", "cd"]),
            typed(),
            ContinueMode::Prompt,
            |_| {},
            move || flag.set(true),
        );

        clock.advance_to(100);
        assert_eq!(seq.view().current.visible(), "a");
        clock.advance_to(200);
        assert_eq!(seq.view().current.visible(), "ab");
        assert_eq!(seq.view().index, 0);

        // second caption starts after the pause, typed from scratch
        clock.advance_to(2200);
        assert_eq!(seq.view().index, 1);
        assert_eq!(seq.view().current.visible(), "");
        clock.advance_to(2400);
        assert_eq!(seq.view().current.visible(), "cd");
        assert!(!seq.view().show_continue);

        clock.advance_to(3400);
        assert!(seq.view().show_continue);
        assert!(!finished.get());
    }

    #[test]
    fn held_captions_step_on_hold_time() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let captions = lines(&["So...", "I've been thinking...", "For a while now..."]);
        let seq =
            CaptionSequence::start(&scope, captions, held(), ContinueMode::Prompt, |_| {}, || {});

        assert_eq!(seq.view().current.visible(), "So...");
        clock.advance_to(1800);
        assert_eq!(seq.view().index, 1);
        clock.advance_to(3600);
        assert_eq!(seq.view().index, 2);
        clock.advance_to(5099);
        assert!(!seq.view().show_continue);
        clock.advance_to(5100);
        assert!(seq.view().show_continue);
    }

    #[test]
    fn auto_mode_finishes_by_itself() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let finished = Rc::new(Cell::new(0));
        let count = finished.clone();

        let seq = CaptionSequence::start(
            &scope,
            lines(&["x"]),
            held(),
            ContinueMode::Auto,
            |_| {},
            move || count.set(count.get() + 1),
        );
        clock.advance_to(10_000);

        assert_eq!(finished.get(), 1);
        assert!(!seq.view().show_continue);
    }

    #[test]
    fn empty_sequence_goes_straight_to_prompt() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let seq =
            CaptionSequence::start(&scope, Vec::new(), held(), ContinueMode::Prompt, |_| {}, || {});
        clock.advance_to(1500);
        assert!(seq.view().show_continue);
    }

    #[test]
    fn no_updates_after_teardown() {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let updates = Rc::new(Cell::new(0));
        let seen = updates.clone();

        CaptionSequence::start(
            &scope,
            lines(&["hello", "world"]),
            typed(),
            ContinueMode::Auto,
            move |_| seen.set(seen.get() + 1),
            || panic!("finished after teardown"),
        );
        clock.advance_to(250);
        let before = updates.get();
        scope.cancel();
        clock.advance_to(60_000);

        assert_eq!(updates.get(), before);
        assert_eq!(clock.pending(), 0);
    }
}
