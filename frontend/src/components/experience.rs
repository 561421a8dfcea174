use std::rc::Rc;

use tracing::info;
use yew::prelude::*;

use super::ask::AskScene;
use super::captions::CaptionScene;
use super::celebration::CelebrationScene;
use super::entry::EntryScene;
use crate::config::Experience;
use crate::story::script::ContinueMode;
use crate::story::sequencer::{Scene, SceneSequencer};
use crate::timeline::SchedulerHandle;

/// Window event fired once when the recipient opens the experience. An
/// audio player on the host page can listen for it.
pub const AMBIENCE_EVENT: &str = "xoxo:ambience";

#[derive(Properties, PartialEq)]
pub struct ExperienceProps {
    pub experience: Rc<Experience>,
}

fn signal_ambience() {
    let Some(window) = web_sys::window() else {
        return;
    };
    match web_sys::CustomEvent::new(AMBIENCE_EVENT) {
        Ok(event) => {
            if window.dispatch_event(&event).is_err() {
                info!("ambience event was not delivered");
            }
        }
        Err(_) => info!("could not create ambience event"),
    }
}

#[function_component(ExperienceRoot)]
pub fn experience_root(props: &ExperienceProps) -> Html {
    let experience = props.experience.clone();
    let sequencer = use_reducer(SceneSequencer::new);
    let scheduler = use_memo(|_| SchedulerHandle::browser(), ());

    {
        let title = experience.title();
        use_effect_with_deps(
            move |title: &String| {
                if let Some(document) = web_sys::window().and_then(|w| w.document()) {
                    document.set_title(title);
                }
                || ()
            },
            title,
        );
    }

    // Every scene only ever moves on to the next one on the path.
    let advance = {
        let sequencer = sequencer.clone();
        let next = sequencer.current().successor();
        Callback::from(move |_: ()| {
            if let Some(next) = next {
                sequencer.dispatch(next);
            }
        })
    };

    let on_open = {
        let advance = advance.clone();
        Callback::from(move |_: ()| {
            signal_ambience();
            advance.emit(());
        })
    };

    let scene = match sequencer.current() {
        Scene::Entry => html! {
            <EntryScene
                recipient={experience.recipient.clone()}
                sender={experience.sender.clone()}
                on_open={on_open}
            />
        },
        Scene::BuildUp => html! {
            <CaptionScene
                key="build-up"
                variant="build-up"
                heading={Some(AttrValue::from(format!("Dear {},", experience.recipient)))}
                captions={experience.build_up.clone()}
                timing={experience.build_up_timing}
                mode={experience.build_up_mode}
                on_continue={advance.clone()}
            />
        },
        Scene::Tease => html! {
            <CaptionScene
                key="tease"
                variant="tease"
                captions={experience.tease.clone()}
                timing={experience.tease_timing}
                mode={ContinueMode::Prompt}
                on_continue={advance.clone()}
            />
        },
        Scene::Ask => html! {
            <AskScene experience={experience.clone()} on_accept={advance.clone()} />
        },
        Scene::Celebration => html! {
            <CelebrationScene experience={experience.clone()} />
        },
        Scene::Rejected => html! {
            <div class="scene scene-rejected">
                <p>{"Maybe next time 💔"}</p>
            </div>
        },
    };

    html! {
        <ContextProvider<SchedulerHandle> context={(*scheduler).clone()}>
            <main class={classes!("experience", format!("flavor-{}", experience.flavor))}>
                {scene}
            </main>
        </ContextProvider<SchedulerHandle>>
    }
}
