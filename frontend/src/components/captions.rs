use yew::prelude::*;

use super::use_scheduler;
use crate::story::script::{CaptionSequence, CaptionTiming, CaptionView, ContinueMode};

#[derive(Properties, PartialEq)]
pub struct CaptionProps {
    /// Extra class for flavor-specific styling, e.g. "build-up" or "tease".
    pub variant: AttrValue,
    #[prop_or_default]
    pub heading: Option<AttrValue>,
    pub captions: Vec<String>,
    pub timing: CaptionTiming,
    pub mode: ContinueMode,
    pub on_continue: Callback<()>,
}

#[function_component(CaptionScene)]
pub fn caption_scene(props: &CaptionProps) -> Html {
    let scheduler = use_scheduler();
    let view = use_state(|| None::<CaptionView>);

    {
        let view = view.clone();
        let captions = props.captions.clone();
        let timing = props.timing;
        let mode = props.mode;
        let on_continue = props.on_continue.clone();
        use_effect_with_deps(
            move |_| {
                let scope = scheduler.scope();
                let sequence = CaptionSequence::start(
                    &scope,
                    captions,
                    timing,
                    mode,
                    move |current: &CaptionView| view.set(Some(current.clone())),
                    move || on_continue.emit(()),
                );
                move || {
                    sequence.cancel();
                    scope.cancel();
                }
            },
            (),
        );
    }

    let (full, text, typing, show_continue, index) = match &*view {
        Some(v) => (
            v.current.source_text().to_string(),
            v.current.visible().to_string(),
            !v.current.is_complete(),
            v.show_continue,
            v.index,
        ),
        None => (String::new(), String::new(), true, false, 0),
    };

    let onclick = {
        let on_continue = props.on_continue.clone();
        Callback::from(move |_: MouseEvent| on_continue.emit(()))
    };

    html! {
        <div class={classes!("scene", "scene-captions", format!("scene-{}", props.variant))}>
            <style>
                {r#"
                    .caption { min-height: 3em; }
                    .caption .cursor { animation: blink 1s step-end infinite; }
                    @keyframes blink { 50% { opacity: 0; } }
                    .continue-button { opacity: 0; animation: fadeIn 0.6s forwards; }
                    @keyframes fadeIn { to { opacity: 1; } }
                "#}
            </style>
            if let Some(heading) = &props.heading {
                <h2 class="caption-heading">{heading.clone()}</h2>
            }
            <p class="caption" key={index.to_string()} aria-label={full}>
                {text}
                if typing {
                    <span class="cursor">{"|"}</span>
                }
            </p>
            if show_continue {
                <button class="continue-button" {onclick}>{"Continue →"}</button>
            }
        </div>
    }
}
