use yew::prelude::*;

/// Renders the application header
pub fn render_header() -> Html {
    html! {
        <header class="app-header">
            <h1><i class="fa-solid fa-seedling"></i> {" CropGuard Scanner"}</h1>
            <p class="subtitle">{"Photograph a crop, get a diagnosis, find a treatment"}</p>
        </header>
    }
}
