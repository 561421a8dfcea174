use yew::prelude::*;

#[derive(Properties, PartialEq)]
pub struct EntryProps {
    pub recipient: String,
    pub sender: String,
    pub on_open: Callback<()>,
}

/// Sealed envelope. Opening it is the only way forward.
#[function_component(EntryScene)]
pub fn entry_scene(props: &EntryProps) -> Html {
    let opened = use_state(|| false);

    let onclick = {
        let opened = opened.clone();
        let on_open = props.on_open.clone();
        Callback::from(move |e: MouseEvent| {
            e.prevent_default();
            if *opened {
                return;
            }
            opened.set(true);
            on_open.emit(());
        })
    };

    html! {
        <div class="scene scene-entry">
            <style>
                {r#"
                    .envelope {
                        font-size: 6rem;
                        cursor: pointer;
                        background: none;
                        border: none;
                        animation: float 3s ease-in-out infinite;
                    }
                    @keyframes float {
                        0%, 100% { transform: translateY(0); }
                        50% { transform: translateY(-12px); }
                    }
                "#}
            </style>
            <p class="entry-to">{format!("For {}", props.recipient)}</p>
            <button class="envelope" {onclick} aria-label="Open">{"💌"}</button>
            <p class="entry-hint">{"Tap to open"}</p>
            <p class="entry-from">{format!("From {}", props.sender)}</p>
        </div>
    }
}
