use tracing::info;
use yew::prelude::*;
use yew_router::prelude::*;

use xoxo_frontend::components::ExperienceRoot;
use xoxo_frontend::config::{ExperienceConfig, Flavor};

#[derive(Clone, Debug, Routable, PartialEq)]
pub enum Route {
    #[at("/")]
    Home,
    #[at("/doodle")]
    Doodle,
    #[at("/paper")]
    Paper,
    #[at("/minimal")]
    Minimal,
    #[not_found]
    #[at("/404")]
    NotFound,
}

impl Route {
    /// Flavor forced by the path; `/` defers to the page config.
    fn flavor(&self) -> Option<Flavor> {
        match self {
            Route::Doodle => Some(Flavor::Doodle),
            Route::Paper => Some(Flavor::Paper),
            Route::Minimal => Some(Flavor::Minimal),
            Route::Home | Route::NotFound => None,
        }
    }
}

#[derive(Properties, PartialEq)]
struct SessionProps {
    flavor: Option<Flavor>,
}

#[function_component(Session)]
fn session(props: &SessionProps) -> Html {
    let experience = use_memo(
        |flavor| ExperienceConfig::from_page().resolve(*flavor),
        props.flavor,
    );
    html! { <ExperienceRoot {experience} /> }
}

fn switch(route: Route) -> Html {
    info!(?route, "Rendering experience");
    let flavor = route.flavor();
    let key = flavor.map_or_else(|| "configured".to_string(), |f| f.to_string());
    html! { <Session key={key} {flavor} /> }
}

#[function_component]
fn App() -> Html {
    html! {
        <BrowserRouter>
            <Switch<Route> render={switch} />
        </BrowserRouter>
    }
}

fn main() {
    console_error_panic_hook::set_once();
    tracing_wasm::set_as_global_default();

    info!("Starting application");
    yew::Renderer::<App>::new().render();
}
