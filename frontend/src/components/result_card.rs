use super::super::Model;
use super::super::Msg;
use super::utils::{debounce, render_severity_badge, severity_class};
use shared::MANUAL_CROP_TYPE;
use yew::prelude::*;

pub fn render_result_card(model: &Model, ctx: &Context<Model>) -> Html {
    let result = match model.result() {
        Some(result) => result,
        None => return html! {},
    };

    let is_manual = result.crop_type == MANUAL_CROP_TYPE;
    let link = ctx.link().clone();
    let saved = model.saved_entry_id.is_some();

    html! {
        <div class={classes!("results-container", severity_class(result.severity))}>
            <div class="result-header">
                <h2>
                    {
                        if is_manual {
                            html! { <><i class="fa-solid fa-hand-pointer"></i>{" Manual Selection"}</> }
                        } else {
                            html! { <><i class="fa-solid fa-stethoscope"></i>{" Diagnosis"}</> }
                        }
                    }
                    <span class="disease-name-display">{ &result.disease_name }</span>
                </h2>
                {
                    if is_manual {
                        html! {
                            <p class="manual-note">
                                {"Picked from the disease reference list; confidence is not applicable."}
                            </p>
                        }
                    } else {
                        html! {
                            <div class="confidence-meter">
                                <div class="meter-label">{"Confidence:"}</div>
                                <div class="meter">
                                    <div class="meter-fill" style={format!("width: {}%", result.confidence)}></div>
                                </div>
                                <div class="meter-value">{format!("{:.1}%", result.confidence)}</div>
                            </div>
                        }
                    }
                }
            </div>

            <div class="result-summary">
                <span class="crop-type">
                    <i class="fa-solid fa-wheat-awn"></i>{ format!(" {}", result.crop_type) }
                </span>
                { render_severity_badge(result.severity) }
            </div>

            <div class="detailed-results">
                <h3>{"Symptoms"}</h3>
                <ul class="symptom-list">
                    { for result.symptoms.iter().map(|symptom| html! { <li>{ symptom }</li> }) }
                </ul>

                <h3>{"Treatment"}</h3>
                <p class="treatment-text">{ &result.treatment }</p>

                <h3>{"Prevention"}</h3>
                <ul class="prevention-list">
                    { for result.prevention.iter().map(|step| html! { <li>{ step }</li> }) }
                </ul>
            </div>

            <div class="button-container">
                <button
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::SaveScan)
                    })}
                    disabled={saved}
                >
                    {
                        if saved {
                            html! { <><i class="fa-solid fa-check"></i>{" Saved to History"}</> }
                        } else {
                            html! { <><i class="fa-solid fa-floppy-disk"></i>{" Save to History"}</> }
                        }
                    }
                </button>
            </div>
        </div>
    }
}
