use super::super::Model;
use super::super::Msg;
use super::utils::{debounce, extract_image_files, truncate_file_name};
use wasm_bindgen::JsCast;
use web_sys::{DragEvent, HtmlInputElement};
use yew::prelude::*;

pub fn render_upload_section(model: &Model, ctx: &Context<Model>) -> Html {
    html! {
        <div class="upload-section">
            {
                if model.photo.is_none() {
                    render_file_input_area(model, ctx)
                } else {
                    render_photo_panel(model, ctx)
                }
            }
        </div>
    }
}

fn render_file_input_area(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link();
    let handle_change = link.callback(|e: Event| {
        let input: HtmlInputElement = e.target_unchecked_into();
        let files = input.files();
        let mut images = files.as_ref().map(extract_image_files).unwrap_or_default();

        input.set_value("");

        if images.is_empty() {
            Msg::SetError(Some("No valid image file selected.".into()))
        } else {
            Msg::PhotoSelected(images.remove(0))
        }
    });

    let handle_drag_over = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(true)
    });

    let handle_drag_leave = link.callback(|e: DragEvent| {
        e.prevent_default();
        Msg::SetDragging(false)
    });

    let handle_drop = link.callback(Msg::HandleDrop);
    let trigger_file_input = Callback::from(|_| {
        if let Some(input) = web_sys::window()
            .unwrap()
            .document()
            .unwrap()
            .get_element_by_id("file-input")
        {
            if let Ok(html_input) = input.dyn_into::<web_sys::HtmlElement>() {
                html_input.click();
            }
        }
    });

    html! {
        <>
            <input
                type="file"
                id="file-input"
                accept="image/*"
                style="display: none;"
                onchange={handle_change}
            />

            <button
                id="upload-button"
                class="analyze-btn"
                onclick={debounce(300, {
                    let trigger_file_input = trigger_file_input.clone();
                    move || trigger_file_input.emit(())
                })}
            >
                <i class="fa-solid fa-camera"></i> {" Select Photo"}
            </button>

            <div
                id="drop-zone"
                class={classes!("upload-area", model.is_dragging.then_some("drag-over"))}
                ondragover={handle_drag_over}
                ondragleave={handle_drag_leave}
                ondrop={handle_drop}
                onclick={debounce(300, {
                    let trigger_file_input = trigger_file_input.clone();
                    move || trigger_file_input.emit(())
                })}
            >
                <div class="upload-placeholder">
                    <i class="fa-solid fa-cloud-arrow-up"></i>
                    <p>{"Drag & drop a crop photo here, paste, or click"}</p>
                    <p class="file-types">{"Supported formats: JPG, PNG, WEBP"}</p>
                </div>
            </div>
        </>
    }
}

fn render_photo_panel(model: &Model, ctx: &Context<Model>) -> Html {
    let link = ctx.link().clone();

    html! {
        <div id="photo-panel">
            { render_photo_preview(model) }
            { render_photo_meta(model) }

            <div class="farm-field">
                <label for="farm-id-input">{"Farm ID (optional)"}</label>
                <input
                    id="farm-id-input"
                    type="text"
                    placeholder="e.g. north-paddock"
                    value={model.farm_id.clone()}
                    oninput={link.callback(|e: InputEvent| {
                        let input: HtmlInputElement = e.target_unchecked_into();
                        Msg::SetFarmId(input.value())
                    })}
                />
            </div>

            <div class="button-container">
                <button
                    class="analyze-btn"
                    style="background-color: var(--danger-color);"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::ClearPhoto)
                    })}
                >
                    <i class="fa-solid fa-rotate-left"></i>{" New Photo"}
                </button>
                <button
                    class="analyze-btn"
                    onclick={debounce(300, {
                        let link = link.clone();
                        move || link.send_message(Msg::Analyze)
                    })}
                    disabled={model.uploading || model.encoded.is_none() || model.scan.in_flight()}
                >
                    { render_analyze_button_content(model) }
                </button>
            </div>
        </div>
    }
}

fn render_photo_preview(model: &Model) -> Html {
    let preview_url = model
        .photo
        .as_ref()
        .and_then(|photo| photo.preview_url.as_ref());

    match preview_url {
        Some(url) => html! {
            <img id="photo-preview"
                src={url.to_string()}
                alt="Crop photo preview" />
        },
        None => html! {
            <div class="loading-preview">
                <i class="fa-solid fa-spinner fa-spin fa-2x"></i>
                <p style="margin-left: 10px;">{"Loading preview..."}</p>
            </div>
        },
    }
}

fn render_photo_meta(model: &Model) -> Html {
    let file_name = model
        .photo
        .as_ref()
        .map(|photo| photo.file.name())
        .unwrap_or_default();

    html! {
        <p class="photo-meta">
            <i class="fa-solid fa-image"></i>
            { format!(" {}", file_name) }
            {
                if model.uploading {
                    html! { <span class="photo-status"><i class="fa-solid fa-spinner fa-spin"></i>{" Preparing..."}</span> }
                } else if let Some(encoded) = &model.encoded {
                    html! { <span class="photo-status">{ format!("{}x{}", encoded.width, encoded.height) }</span> }
                } else {
                    html! {}
                }
            }
        </p>
    }
}

fn render_analyze_button_content(model: &Model) -> Html {
    if model.scan.in_flight() {
        html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Analyzing..."}</> }
    } else if model.uploading {
        html! { <><i class="fa-solid fa-spinner fa-spin"></i>{" Preparing photo..."}</> }
    } else {
        let filename = model
            .photo
            .as_ref()
            .map(|photo| photo.file.name())
            .unwrap_or_else(|| "Selected Photo".to_string());

        let display_name = truncate_file_name(&filename, 20);

        html! { <><i class="fa-solid fa-magnifying-glass"></i>{ format!(" Analyze \"{}\"", display_name) }</> }
    }
}
