use super::super::Model;
use gloo_file::File as GlooFile;
use gloo_storage::{LocalStorage, Storage};
use gloo_timers::callback::Timeout;
use js_sys::Date;
use shared::Severity;
use std::cell::RefCell;
use std::rc::Rc;
use web_sys::FileList;
use yew::prelude::*;

const USER_ID_KEY: &str = "cropguard_user_id";

/// Stable anonymous user id, minted on first visit and kept in local
/// storage so scan history survives reloads.
pub fn anonymous_user_id() -> String {
    if let Ok(existing) = LocalStorage::get::<String>(USER_ID_KEY) {
        return existing;
    }

    let fresh = format!(
        "farmer-{:x}",
        (Date::now() * 1000.0 + js_sys::Math::random() * 1000.0) as u64
    );
    if let Err(e) = LocalStorage::set(USER_ID_KEY, &fresh) {
        log::warn!("Could not persist user id: {:?}", e);
    }
    fresh
}

// Debounce function to limit button events
pub fn debounce<F>(duration: i32, callback: F) -> Callback<MouseEvent>
where
    F: Fn() + Clone + 'static,
{
    let timeout = Rc::new(RefCell::new(None::<Timeout>));
    let timeout_clone = Rc::clone(&timeout);

    Callback::from(move |_| {
        let mut timeout_ref = timeout_clone.borrow_mut();

        if let Some(old_timeout) = timeout_ref.take() {
            old_timeout.cancel();
        }

        let inner_callback = callback.clone();
        let new_timeout = Timeout::new(duration as u32, move || {
            inner_callback();
        });

        *timeout_ref = Some(new_timeout);
    })
}

pub fn extract_image_files(file_list: &FileList) -> Vec<GlooFile> {
    (0..file_list.length())
        .filter_map(|i| file_list.item(i))
        .filter(|file| file.type_().starts_with("image/"))
        .map(GlooFile::from)
        .collect()
}

/// Shorten a file name for button labels. Counts characters rather than
/// bytes so multi-byte names are never split mid-character.
pub fn truncate_file_name(name: &str, max_chars: usize) -> String {
    if name.chars().count() <= max_chars {
        return name.to_string();
    }
    let kept: String = name.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", kept)
}

pub fn severity_class(severity: Severity) -> &'static str {
    match severity {
        Severity::Mild => "severity-mild",
        Severity::Moderate => "severity-moderate",
        Severity::Severe => "severity-severe",
    }
}

pub fn render_severity_badge(severity: Severity) -> Html {
    html! {
        <span class={classes!("severity-badge", severity_class(severity))}>
            { severity.to_string() }
        </span>
    }
}

/// "2026-08-25T14:03:27Z" -> "2026-08-25 14:03".
pub fn short_timestamp(rfc3339: &str) -> String {
    rfc3339
        .get(..16)
        .map(|s| s.replace('T', " "))
        .unwrap_or_else(|| rfc3339.to_string())
}

pub fn render_error_message(model: &Model) -> Html {
    if let Some(error_msg) = &model.error {
        html! {
            <div class="error-message">
                <i class="fa-solid fa-circle-exclamation"></i>
                <p>{ error_msg }</p>
            </div>
        }
    } else {
        html! {}
    }
}
