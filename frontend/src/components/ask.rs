use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use yew::prelude::*;

use super::use_scheduler;
use crate::config::Experience;
use crate::story::evasion::NoGesture;
use crate::story::script::{AskScript, AskView};

#[derive(Properties, PartialEq)]
pub struct AskProps {
    pub experience: Rc<Experience>,
    pub on_accept: Callback<()>,
}

/// Touch and pen taps fire `pointerenter` right before `click`; only a
/// real mouse hover counts as its own gesture.
fn counts_as_hover(pointer_type: &str) -> bool {
    pointer_type == "mouse"
}

fn strike_text(marks: u32) -> String {
    "✗".repeat(marks as usize)
}

#[function_component(AskScene)]
pub fn ask_scene(props: &AskProps) -> Html {
    let scheduler = use_scheduler();
    let view = use_state(|| None::<AskView>);
    let script = use_mut_ref(|| None::<AskScript>);

    {
        let view = view.clone();
        let script = script.clone();
        let experience = props.experience.clone();
        let on_accept = props.on_accept.clone();
        use_effect_with_deps(
            move |_| {
                let scope = scheduler.scope();
                let started = AskScript::start(
                    &scope,
                    experience.question.clone(),
                    experience.policy.clone(),
                    experience.taunts.clone(),
                    StdRng::from_entropy(),
                    move |current: &AskView| view.set(Some(current.clone())),
                    move || on_accept.emit(()),
                );
                *script.borrow_mut() = Some(started);
                move || {
                    if let Some(started) = script.borrow_mut().take() {
                        started.cancel();
                    }
                    scope.cancel();
                }
            },
            (),
        );
    }

    let with_script = |action: fn(&AskScript)| {
        let script = script.clone();
        move || {
            let current = script.borrow().clone();
            if let Some(current) = current {
                action(&current);
            }
        }
    };

    let on_yes = {
        let run = with_script(AskScript::press_yes);
        Callback::from(move |_: MouseEvent| run())
    };
    let on_no_hover = {
        let run = with_script(|s: &AskScript| s.no_gesture(NoGesture::Hover));
        Callback::from(move |e: PointerEvent| {
            if counts_as_hover(&e.pointer_type()) {
                run()
            }
        })
    };
    let on_no_press = {
        let run = with_script(|s: &AskScript| s.no_gesture(NoGesture::Press));
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            run()
        })
    };

    let Some(view) = (*view).clone() else {
        return html! { <div class="scene scene-ask" /> };
    };

    let look = view.interaction.look();
    let no_style = format!(
        "transform: translate({:.1}px, {:.1}px) rotate({:.1}deg) scale({:.3}); \
         transition: transform 0.3s ease;",
        look.offset.x, look.offset.y, look.rotation_degrees, look.scale,
    );
    let yes_style = format!(
        "transform: scale({:.3}); transition: transform 0.3s ease;",
        view.yes_scale
    );
    let strikes = strike_text(view.strike_marks);
    let no_class = classes!(
        "ask-no",
        format!("phase-{:?}", look.phase).to_lowercase(),
        view.interaction.is_transiently_evading.then_some("evading"),
        look.is_converted.then_some("converted"),
    );

    html! {
        <div class="scene scene-ask">
            <style>
                {r#"
                    .ask-buttons {
                        display: flex;
                        gap: 2rem;
                        justify-content: center;
                        align-items: center;
                    }
                    .ask-no.evading { animation: shake 0.3s; }
                    @keyframes shake {
                        25% { margin-left: -6px; }
                        75% { margin-left: 6px; }
                    }
                    .strike { color: hsl(350, 80%, 55%); letter-spacing: 0.2em; }
                "#}
            </style>
            <h1 class="ask-question">
                {view.question.visible().to_string()}
                if !view.question.is_complete() {
                    <span class="cursor">{"|"}</span>
                }
            </h1>
            if view.controls_visible {
                <div class="ask-controls">
                    if let Some(taunt) = view.taunt.clone() {
                        <p class="ask-taunt">{taunt}</p>
                    }
                    if view.strike_marks > 0 {
                        <p class="strike">{strikes}</p>
                    }
                    <div class="ask-buttons">
                        <button class="ask-yes" style={yes_style} onclick={on_yes}>
                            {"Yes 💖"}
                        </button>
                        <button
                            class={no_class}
                            style={no_style}
                            onpointerenter={on_no_hover}
                            onclick={on_no_press}
                        >
                            {look.display_text.clone()}
                        </button>
                    </div>
                </div>
            }
        </div>
    }
}
