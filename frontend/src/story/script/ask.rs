use std::cell::RefCell;
use std::rc::Rc;

use rand::rngs::StdRng;
use tracing::info;

use super::Listener;
use crate::story::evasion::{EvasionPolicy, Interaction, InteractionState, NoGesture};
use crate::story::reveal::{RevealHandle, RevealSpec, RevealState};
use crate::timeline::TaskScope;

#[derive(Clone, Debug, PartialEq)]
pub struct AskView {
    pub question: RevealState,
    /// Yes/No controls appear once the question is fully revealed.
    pub controls_visible: bool,
    pub interaction: InteractionState,
    /// Teasing caption above the No control.
    pub taunt: Option<String>,
    pub yes_scale: f64,
    pub strike_marks: u32,
    pub accepted: bool,
}

struct AskState {
    policy: Rc<EvasionPolicy>,
    taunts: Vec<String>,
    rng: StdRng,
    view: AskView,
    listener: Listener<AskView>,
    on_accept: Rc<dyn Fn()>,
    /// Scope of the pending transient-evading reset.
    flash: Option<TaskScope>,
}

/// The question scene: reveal the question, then run the chase until the
/// recipient accepts, either through "Yes" or the converted "No".
#[derive(Clone)]
pub struct AskScript {
    scope: TaskScope,
    state: Rc<RefCell<AskState>>,
}

impl AskScript {
    pub fn start(
        scope: &TaskScope,
        question: RevealSpec,
        policy: Rc<EvasionPolicy>,
        taunts: Vec<String>,
        rng: StdRng,
        listener: impl Fn(&AskView) + 'static,
        on_accept: impl Fn() + 'static,
    ) -> Self {
        let interaction = policy.initial_state();
        let script = Self {
            scope: scope.child(),
            state: Rc::new(RefCell::new(AskState {
                view: AskView {
                    question: RevealState::complete(""),
                    controls_visible: false,
                    yes_scale: policy.yes_scale(0),
                    strike_marks: 0,
                    taunt: None,
                    interaction,
                    accepted: false,
                },
                policy,
                taunts,
                rng,
                listener: Rc::new(listener),
                on_accept: Rc::new(on_accept),
                flash: None,
            })),
        };

        let on_tick = script.clone();
        let on_done = script.clone();
        RevealHandle::schedule(
            &script.scope,
            question,
            move |reveal| on_tick.publish(|view| view.question = reveal.clone()),
            move |reveal| {
                on_done.publish(|view| {
                    view.question = reveal.clone();
                    view.controls_visible = true;
                })
            },
        );
        script
    }

    #[cfg(test)]
    pub fn view(&self) -> AskView {
        self.state.borrow().view.clone()
    }

    pub fn press_yes(&self) {
        if !self.ready() {
            return;
        }
        info!("yes pressed");
        self.accept();
    }

    pub fn no_gesture(&self, gesture: NoGesture) {
        if !self.ready() {
            return;
        }

        let (outcome, evading, flash_ms) = {
            let mut guard = self.state.borrow_mut();
            let state = &mut *guard;
            let outcome =
                state.policy.on_interact(&mut state.view.interaction, gesture, &mut state.rng);
            (
                outcome,
                state.view.interaction.is_transiently_evading,
                state.policy.tuning().evade_flash_ms,
            )
        };

        match outcome {
            Interaction::Accepted => self.accept(),
            Interaction::Ignored => {}
            Interaction::Rejected { count } => {
                self.refresh_extras(count);
                if evading {
                    self.schedule_flash_reset(flash_ms);
                }
            }
        }
    }

    pub fn cancel(&self) {
        self.scope.cancel();
    }

    fn ready(&self) -> bool {
        let state = self.state.borrow();
        state.view.controls_visible && !state.view.accepted && !self.scope.is_cancelled()
    }

    fn accept(&self) {
        let on_accept = {
            let mut state = self.state.borrow_mut();
            if state.view.accepted {
                return;
            }
            state.view.accepted = true;
            state.on_accept.clone()
        };
        self.publish(|_| {});
        on_accept();
    }

    fn refresh_extras(&self, count: u32) {
        let (taunt, yes_scale, strikes) = {
            let state = self.state.borrow();
            let taunt = if state.policy.is_converted(count) || state.taunts.is_empty() {
                None
            } else {
                let index = (count as usize).saturating_sub(1).min(state.taunts.len() - 1);
                Some(state.taunts[index].clone())
            };
            (taunt, state.policy.yes_scale(count), state.policy.strike_marks(count))
        };
        self.publish(|view| {
            view.taunt = taunt;
            view.yes_scale = yes_scale;
            view.strike_marks = strikes;
        });
    }

    fn schedule_flash_reset(&self, flash_ms: u32) {
        let flash = self.scope.child();
        if let Some(previous) = self.state.borrow_mut().flash.replace(flash.clone()) {
            previous.cancel();
        }
        let script = self.clone();
        flash.spawn_after(flash_ms, move || {
            script.publish(|view| view.interaction.is_transiently_evading = false);
        });
    }

    fn publish(&self, change: impl FnOnce(&mut AskView)) {
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
    use crate::story::evasion::{EvasionTuning, TextLadder};
    use crate::timeline::VirtualClock;
    use rand::SeedableRng;
    use std::cell::Cell;

    struct Fixture {
        clock: Rc<VirtualClock>,
        scope: TaskScope,
        script: AskScript,
        accepted: Rc<Cell<u32>>,
        updates: Rc<Cell<u32>>,
    }

    fn fixture(threshold: u32) -> Fixture {
        let clock = VirtualClock::new();
        let scope = TaskScope::new(clock.clone());
        let ladder = [
            "No",
            "Nope",
            "Still no?",
            "Really?",
            "Aw cmon!",
            "Pweease?",
            "Last chance!",
            "FINE. Yes.",
            "Yes",
        ];
        let ladder = TextLadder::new(ladder.into_iter().map(String::from).collect()).unwrap();
        let policy = Rc::new(EvasionPolicy::new(ladder, threshold, EvasionTuning::default()));
        let accepted = Rc::new(Cell::new(0));
        let updates = Rc::new(Cell::new(0));
        let (a, u) = (accepted.clone(), updates.clone());
        let script = AskScript::start(
            &scope,
            RevealSpec::characters("Sam, be mine?", 75).after(800),
            policy,
            vec!["Are you sure?".into(), "Really?".into()],
            StdRng::seed_from_u64(9),
            move |_| u.set(u.get() + 1),
            move || a.set(a.get() + 1),
        );
        Fixture {
            clock,
            scope,
            script,
            accepted,
            updates,
        }
    }

    #[test]
    fn controls_appear_after_question_is_revealed() {
        let f = fixture(8);
        f.script.press_yes();
        assert_eq!(f.accepted.get(), 0);

        // 13 characters, 800ms lead-in, 75ms each
        f.clock.advance_to(800 + 75 * 12);
        assert!(!f.script.view().controls_visible);
        f.clock.advance_to(800 + 75 * 13);
        let view = f.script.view();
        assert_eq!(view.question.visible(), "Sam, be mine?");
        assert!(view.controls_visible);
    }

    #[test]
    fn gestures_before_controls_are_ignored() {
        let f = fixture(8);
        f.script.no_gesture(NoGesture::Press);
        assert_eq!(f.script.view().interaction.rejection_count(), 0);
    }

    #[test]
    fn yes_accepts_once() {
        let f = fixture(8);
        f.clock.advance_by(5_000);
        f.script.press_yes();
        f.script.press_yes();
        f.script.no_gesture(NoGesture::Press);
        assert_eq!(f.accepted.get(), 1);
        assert!(f.script.view().accepted);
    }

    #[test]
    fn chase_ends_with_converted_no_press() {
        let f = fixture(8);
        f.clock.advance_by(5_000);

        for _ in 0..8 {
            f.script.no_gesture(NoGesture::Hover);
        }
        let view = f.script.view();
        assert_eq!(view.interaction.rejection_count(), 8);
        assert!(view.interaction.is_converted());
        assert_eq!(view.taunt, None);
        assert_eq!(view.interaction.look().display_text, "Yes");

        f.script.no_gesture(NoGesture::Hover);
        assert_eq!(f.accepted.get(), 0);
        f.script.no_gesture(NoGesture::Press);
        assert_eq!(f.accepted.get(), 1);
        assert_eq!(f.script.view().interaction.rejection_count(), 8);
    }

    #[test]
    fn taunts_and_yes_growth_follow_count() {
        let f = fixture(8);
        f.clock.advance_by(5_000);

        f.script.no_gesture(NoGesture::Press);
        let view = f.script.view();
        assert_eq!(view.taunt.as_deref(), Some("Are you sure?"));
        assert_eq!(view.strike_marks, 1);
        assert!(view.yes_scale > 1.0);

        for _ in 0..3 {
            f.script.no_gesture(NoGesture::Press);
        }
        assert_eq!(f.script.view().taunt.as_deref(), Some("Really?"));
    }

    #[test]
    fn evading_flash_resets_after_timeout() {
        let f = fixture(8);
        f.clock.advance_by(5_000);
        for _ in 0..3 {
            f.script.no_gesture(NoGesture::Press);
        }
        assert!(f.script.view().interaction.is_transiently_evading);

        f.clock.advance_by(299);
        assert!(f.script.view().interaction.is_transiently_evading);
        f.clock.advance_by(1);
        assert!(!f.script.view().interaction.is_transiently_evading);
    }

    #[test]
    fn teardown_stops_reveal_and_flash() {
        let f = fixture(8);
        f.clock.advance_to(1_000);
        let before = f.updates.get();
        f.scope.cancel();
        f.clock.advance_by(10_000);

        assert_eq!(f.updates.get(), before);
        assert!(!f.script.view().controls_visible);
        assert_eq!(f.clock.pending(), 0);
    }
}
