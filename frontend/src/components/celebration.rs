use std::rc::Rc;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::warn;
use yew::prelude::*;

use super::use_scheduler;
use crate::config::Experience;
use crate::story::celebration::{Particle, ParticleShape};
use crate::story::script::{FinaleScript, FinaleView};

#[derive(Properties, PartialEq)]
pub struct CelebrationProps {
    pub experience: Rc<Experience>,
}

fn render_particle(particle: &Particle) -> Html {
    let (class, glyph) = match particle.shape {
        ParticleShape::Circle => ("confetti-circle", ""),
        ParticleShape::Square => ("confetti-square", ""),
        ParticleShape::Heart => ("confetti-glyph", "❤"),
        ParticleShape::Star => ("confetti-glyph", "★"),
    };
    let paint = if glyph.is_empty() {
        format!("background: {};", particle.color)
    } else {
        format!("color: {}; font-size: {:.1}px;", particle.color, particle.size_px)
    };
    let style = format!(
        "left: {:.2}%; width: {:.1}px; height: {:.1}px; {} \
         animation-delay: {:.2}s; animation-duration: {:.2}s; transform: rotate({:.0}deg);",
        particle.x_percent,
        particle.size_px,
        particle.size_px,
        paint,
        particle.delay_s,
        particle.fall_s,
        particle.rotation_deg,
    );
    html! {
        <div key={particle.id.to_string()} class={classes!("confetti-piece", class)} {style}>
            {glyph}
        </div>
    }
}

#[function_component(CelebrationScene)]
pub fn celebration_scene(props: &CelebrationProps) -> Html {
    let scheduler = use_scheduler();
    let view = use_state(FinaleView::default);

    {
        let view = view.clone();
        let settings = props.experience.finale.clone();
        use_effect_with_deps(
            move |_| {
                let scope = scheduler.scope();
                let listener_view = view.clone();
                let started = FinaleScript::start(
                    &scope,
                    &settings,
                    StdRng::from_entropy(),
                    move |current: &FinaleView| listener_view.set(current.clone()),
                );
                let script = match started {
                    Ok(script) => Some(script),
                    Err(e) => {
                        warn!("Skipping confetti: {}", e);
                        view.set(FinaleView {
                            show_message: true,
                            ..FinaleView::default()
                        });
                        None
                    }
                };
                move || {
                    if let Some(script) = script {
                        script.cancel();
                    }
                    scope.cancel();
                }
            },
            (),
        );
    }

    let experience = &props.experience;

    html! {
        <div class="scene scene-celebration">
            <style>
                {r#"
                    .confetti-layer {
                        position: fixed;
                        inset: 0;
                        pointer-events: none;
                        overflow: hidden;
                    }
                    .confetti-piece {
                        position: absolute;
                        top: -20px;
                        animation-name: confettiFall;
                        animation-timing-function: linear;
                        animation-fill-mode: forwards;
                    }
                    .confetti-circle { border-radius: 50%; }
                    .confetti-glyph { line-height: 1; }
                    @keyframes confettiFall {
                        to { top: 110vh; opacity: 0.2; }
                    }
                "#}
            </style>
            <div class="confetti-layer" key={view.confetti.started_at_ms.to_string()}>
                { for view.confetti.pieces.iter().map(render_particle) }
            </div>
            if view.show_message {
                <div class="celebration-message">
                    <h1>{experience.headline.clone()}</h1>
                    <p>{experience.message.clone()}</p>
                    <p class="celebration-signature">{format!("Love, {}", experience.sender)}</p>
                </div>
            }
        </div>
    }
}
