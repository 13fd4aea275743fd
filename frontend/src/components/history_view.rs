use super::super::Model;
use super::super::Msg;
use super::utils::{render_severity_badge, short_timestamp};
use shared::ScanHistoryEntry;
use yew::html::Scope;
use yew::prelude::*;

pub fn render_history_toggle(model: &Model, link: &Scope<Model>) -> Html {
    html! {
        <div class="top-right">
            <button
                id="history-toggle"
                class="history-toggle"
                onclick={link.callback(|_| Msg::ToggleHistory)}
                title={ if model.show_history { "Hide scan history" } else { "Show saved scans" } }
            >
                <i class="fa-solid fa-clock-rotate-left"></i>
                { if model.show_history { " Hide History" } else { " My Scans" } }
            </button>
        </div>
    }
}

pub fn render_history_view(model: &Model) -> Html {
    if !model.show_history {
        return html! {};
    }

    html! {
        <div class="history-container">
            <h3><i class="fa-solid fa-clock-rotate-left"></i>{" Scan History"}</h3>
            {
                if model.history_loading {
                    html! {
                        <p class="history-loading">
                            <i class="fa-solid fa-spinner fa-spin"></i>
                            {" Loading saved scans..."}
                        </p>
                    }
                } else if model.history.is_empty() {
                    html! { <p class="history-empty">{"No saved scans yet."}</p> }
                } else {
                    html! {
                        <div class="history-list">
                            { for model.history.iter().map(render_history_entry) }
                        </div>
                    }
                }
            }
        </div>
    }
}

fn render_history_entry(entry: &ScanHistoryEntry) -> Html {
    let photo_url = format!("/api/history/{}/{}/photo", entry.user_id, entry.id);

    html! {
        <div class="history-entry" key={entry.id.clone()}>
            <img class="history-photo" src={photo_url} alt={entry.result.disease_name.clone()} />
            <div class="history-details">
                <h4>{ &entry.result.disease_name }</h4>
                <p class="history-crop">
                    { &entry.result.crop_type }
                    { " " }
                    { render_severity_badge(entry.result.severity) }
                </p>
                <p class="history-meta">
                    { short_timestamp(&entry.created_at) }
                    {
                        if let Some(farm_id) = &entry.farm_id {
                            html! { <span class="history-farm">{ format!(" | {}", farm_id) }</span> }
                        } else {
                            html! {}
                        }
                    }
                </p>
            </div>
        </div>
    }
}
