use super::super::Model;
use super::super::Msg;
use super::utils::{debounce, render_severity_badge};
use shared::{DiseaseReference, ScanEvent};
use yew::prelude::*;

pub fn render_fallback_picker(model: &Model, ctx: &Context<Model>) -> Html {
    let (reason, candidates) = match model.fallback_candidates() {
        Some(parts) => parts,
        None => return html! {},
    };

    html! {
        <div class="fallback-container">
            <div class="fallback-banner">
                <i class="fa-solid fa-triangle-exclamation"></i>
                <div>
                    <p class="fallback-reason">{ format!("Automatic analysis failed: {}", reason) }</p>
                    <p class="fallback-hint">{"Pick the closest match below, or start over with a new photo."}</p>
                </div>
            </div>

            {
                if candidates.is_empty() {
                    html! {
                        <p class="fallback-empty">
                            {"The disease reference list is unavailable right now. Try again in a moment."}
                        </p>
                    }
                } else {
                    html! {
                        <div class="candidate-grid">
                            { for candidates.iter().map(|candidate| render_candidate(ctx, candidate)) }
                        </div>
                    }
                }
            }

            <div class="button-container">
                <button
                    class="analyze-btn"
                    style="background-color: var(--danger-color);"
                    onclick={debounce(300, {
                        let link = ctx.link().clone();
                        move || link.send_message(Msg::ClearPhoto)
                    })}
                >
                    <i class="fa-solid fa-rotate-left"></i>{" Start Over"}
                </button>
            </div>
        </div>
    }
}

fn render_candidate(ctx: &Context<Model>, candidate: &DiseaseReference) -> Html {
    let link = ctx.link();
    let picked = candidate.clone();
    // Double-picks are harmless: once resolved, the state machine drops
    // further pick events.
    let on_pick = link.callback(move |_| Msg::Scan(ScanEvent::CandidatePicked(picked.clone())));

    html! {
        <div class="candidate-card" key={candidate.id.clone()}>
            <div class="candidate-header">
                <h3>{ &candidate.name }</h3>
                { render_severity_badge(candidate.severity) }
            </div>
            <p class="candidate-crops">
                <i class="fa-solid fa-wheat-awn"></i>
                { format!(" Common on: {}", candidate.common_crops.join(", ")) }
            </p>
            <ul class="candidate-symptoms">
                { for candidate.symptoms.iter().map(|symptom| html! { <li>{ symptom }</li> }) }
            </ul>
            <button class="pick-btn" onclick={on_pick}>
                <i class="fa-solid fa-check"></i>{" This matches"}
            </button>
        </div>
    }
}
