use super::super::{Model, Msg, PhotoData};
use crate::components::utils::extract_image_files;
use gloo_file::{File as GlooFile, ObjectUrl};
use gloo_net::http::Request;
use shared::{
    advance, AnalysisRequest, AnalysisResult, DiseaseReference, EncodedImage, ErrorBody,
    ProductRecommendation, SaveScanRequest, ScanEvent, ScanHistoryEntry, ScanPhase,
};
use wasm_bindgen_futures::spawn_local;
use web_sys::{ClipboardEvent, DragEvent, FileList};
use yew::prelude::*;

// Photo selection

pub fn handle_photo_selected(model: &mut Model, ctx: &Context<Model>, file: GlooFile) -> bool {
    // A new photo starts a fresh scan. An answer still in flight for the
    // old photo arrives against Idle, or with a superseded token, and the
    // state machine drops it.
    model.scan = advance(model.scan.clone(), ScanEvent::Reset);
    model.scan_token += 1;
    model.photo = Some(PhotoData {
        file: file.clone(),
        preview_url: None,
    });
    model.encoded = None;
    model.uploading = true;
    model.error = None;
    model.products.clear();
    model.products_loaded = false;
    model.saved_entry_id = None;

    let preview_url = ObjectUrl::from(file.clone());
    ctx.link().send_message(Msg::AddPreview(preview_url));

    send_scan_photo(ctx, file);
    true
}

pub fn handle_add_preview(model: &mut Model, url: ObjectUrl) -> bool {
    if let Some(photo) = model.photo.as_mut() {
        photo.preview_url = Some(url);
        true
    } else {
        false
    }
}

pub fn handle_photo_encoded(model: &mut Model, encoded: EncodedImage) -> bool {
    log::info!(
        "Photo normalized to {}x{} ({} bytes in)",
        encoded.width,
        encoded.height,
        encoded.byte_size
    );
    model.encoded = Some(encoded);
    model.uploading = false;
    true
}

pub fn handle_photo_rejected(model: &mut Model, reason: String) -> bool {
    model.error = Some(reason);
    model.photo = None;
    model.encoded = None;
    model.uploading = false;
    true
}

pub fn handle_clear_photo(model: &mut Model) -> bool {
    if let Some(mut photo) = model.photo.take() {
        let _ = photo.preview_url.take();
    }
    model.encoded = None;
    model.uploading = false;
    model.scan = advance(model.scan.clone(), ScanEvent::Reset);
    model.scan_token += 1;
    model.products.clear();
    model.products_loaded = false;
    model.saved_entry_id = None;
    model.error = None;
    true
}

/// Upload the raw photo for server-side normalization; the scan itself
/// runs later against the returned data URL.
fn send_scan_photo(ctx: &Context<Model>, file: GlooFile) {
    spawn_local({
        let link = ctx.link().clone();

        async move {
            let form_data = web_sys::FormData::new().unwrap();
            form_data.append_with_blob("photo", file.as_ref()).unwrap();

            let request = Request::post("/api/scan-image")
                .body(form_data)
                .expect("Failed to build request.");

            match request.send().await {
                Ok(response) => {
                    if response.ok() {
                        match response.json::<EncodedImage>().await {
                            Ok(encoded) => link.send_message(Msg::PhotoEncoded(encoded)),
                            Err(e) => link.send_message(Msg::PhotoRejected(format!(
                                "Failed to parse response: {}",
                                e
                            ))),
                        }
                    } else {
                        let status = response.status();
                        let reason = match response.json::<ErrorBody>().await {
                            Ok(body) => body.error,
                            Err(_) => format!("Server error: {}", status),
                        };
                        link.send_message(Msg::PhotoRejected(reason));
                    }
                }
                Err(e) => {
                    link.send_message(Msg::PhotoRejected(format!("Network error: {}", e)))
                }
            }
        }
    });
}

// Scan flow

pub fn handle_analyze(model: &mut Model, ctx: &Context<Model>) -> bool {
    if model.scan.in_flight() {
        return false;
    }

    if let Some(encoded) = model.encoded.clone() {
        model.error = None;
        model.products.clear();
        model.products_loaded = false;
        model.saved_entry_id = None;

        // Each submission gets a fresh token; an answer for a superseded
        // submission is dropped by the state machine when it lands.
        model.scan_token += 1;
        let token = model.scan_token;

        let farm_id = farm_id_value(model);
        let changed = handle_scan_event(model, ctx, ScanEvent::Submit { token });
        send_analysis_request(ctx, token, encoded.data_url, farm_id);
        return changed;
    }

    ctx.link()
        .send_message(Msg::SetError(Some("No photo ready for analysis.".into())));
    false
}

/// Single entry point for scan-flow transitions. The shared state machine
/// decides what the event means in the current phase; this layer only adds
/// the follow-up requests a new phase calls for.
pub fn handle_scan_event(model: &mut Model, ctx: &Context<Model>, event: ScanEvent) -> bool {
    let next = advance(model.scan.clone(), event);
    if next == model.scan {
        return false;
    }
    model.scan = next;

    match &model.scan {
        ScanPhase::Failed { .. } => load_fallback_candidates(ctx),
        ScanPhase::Succeeded(result) | ScanPhase::ResolvedByUser(result) => {
            load_product_recommendations(ctx, model.scan_token, result.disease_name.clone());
        }
        _ => {}
    }
    true
}

fn send_analysis_request(
    ctx: &Context<Model>,
    token: u32,
    image_data_url: String,
    farm_id: Option<String>,
) {
    spawn_local({
        let link = ctx.link().clone();

        async move {
            let payload = AnalysisRequest {
                image_base64: image_data_url,
                farm_id,
            };
            let request = Request::post("/api/analyze-crop")
                .json(&payload)
                .expect("Failed to build request.");

            match request.send().await {
                Ok(response) => {
                    if response.ok() {
                        match response.json::<AnalysisResult>().await {
                            Ok(result) => link
                                .send_message(Msg::Scan(ScanEvent::Completed { token, result })),
                            Err(e) => link.send_message(Msg::Scan(ScanEvent::Errored {
                                token,
                                reason: format!("Failed to parse response: {}", e),
                            })),
                        }
                    } else {
                        let status = response.status();
                        let reason = match response.json::<ErrorBody>().await {
                            Ok(body) => body.error,
                            Err(_) => format!("Server error: {}", status),
                        };
                        link.send_message(Msg::Scan(ScanEvent::Errored { token, reason }));
                    }
                }
                Err(e) => link.send_message(Msg::Scan(ScanEvent::Errored {
                    token,
                    reason: format!("Network error: {}", e),
                })),
            }
        }
    });
}

fn load_fallback_candidates(ctx: &Context<Model>) {
    spawn_local({
        let link = ctx.link().clone();

        async move {
            // A failed lookup still offers the (empty) picker rather than
            // dead-ending the flow.
            let candidates = match Request::get("/api/diseases/fallback").send().await {
                Ok(response) if response.ok() => response
                    .json::<Vec<DiseaseReference>>()
                    .await
                    .unwrap_or_else(|e| {
                        log::error!("Failed to parse fallback candidates: {}", e);
                        Vec::new()
                    }),
                Ok(response) => {
                    log::error!("Fallback candidate request returned {}", response.status());
                    Vec::new()
                }
                Err(e) => {
                    log::error!("Fallback candidate request failed: {}", e);
                    Vec::new()
                }
            };
            link.send_message(Msg::Scan(ScanEvent::CandidatesLoaded(candidates)));
        }
    });
}

// Lookups

fn load_product_recommendations(ctx: &Context<Model>, token: u32, disease_name: String) {
    spawn_local({
        let link = ctx.link().clone();

        async move {
            let query = js_sys::encode_uri_component(&disease_name);
            let url = format!("/api/products/recommendations?disease={}", query);

            // Product lookup is decorative; any failure renders as "none".
            let products = match Request::get(&url).send().await {
                Ok(response) if response.ok() => response
                    .json::<Vec<ProductRecommendation>>()
                    .await
                    .unwrap_or_else(|e| {
                        log::error!("Failed to parse product recommendations: {}", e);
                        Vec::new()
                    }),
                Ok(response) => {
                    log::error!("Product request returned {}", response.status());
                    Vec::new()
                }
                Err(e) => {
                    log::error!("Product request failed: {}", e);
                    Vec::new()
                }
            };
            link.send_message(Msg::ProductsLoaded(token, products));
        }
    });
}

pub fn handle_products_loaded(
    model: &mut Model,
    token: u32,
    products: Vec<ProductRecommendation>,
) -> bool {
    // A product list fetched for an earlier scan is stale; drop it.
    if token != model.scan_token {
        return false;
    }
    model.products = products;
    model.products_loaded = true;
    true
}

// History

pub fn handle_save_scan(model: &mut Model, ctx: &Context<Model>) -> bool {
    if model.saved_entry_id.is_some() {
        return false;
    }

    let (result, encoded) = match (model.scan.result(), model.encoded.as_ref()) {
        (Some(result), Some(encoded)) => (result.clone(), encoded.clone()),
        _ => {
            ctx.link()
                .send_message(Msg::SetError(Some("No completed scan to save.".into())));
            return false;
        }
    };

    let payload = SaveScanRequest {
        user_id: model.user_id.clone(),
        farm_id: farm_id_value(model),
        image_data_url: encoded.data_url,
        result,
    };
    model.error = None;

    spawn_local({
        let link = ctx.link().clone();

        async move {
            let request = Request::post("/api/history")
                .json(&payload)
                .expect("Failed to build request.");

            match request.send().await {
                Ok(response) if response.ok() => {
                    match response.json::<ScanHistoryEntry>().await {
                        Ok(entry) => link.send_message(Msg::ScanSaved(entry)),
                        Err(e) => link.send_message(Msg::SetError(Some(format!(
                            "Failed to parse response: {}",
                            e
                        )))),
                    }
                }
                Ok(response) => {
                    let status = response.status();
                    let reason = match response.json::<ErrorBody>().await {
                        Ok(body) => body.error,
                        Err(_) => format!("Server error: {}", status),
                    };
                    link.send_message(Msg::SetError(Some(reason)));
                }
                Err(e) => {
                    link.send_message(Msg::SetError(Some(format!("Network error: {}", e))))
                }
            }
        }
    });
    true
}

pub fn handle_scan_saved(model: &mut Model, entry: ScanHistoryEntry) -> bool {
    log::info!("Scan {} saved to history", entry.id);
    model.saved_entry_id = Some(entry.id.clone());
    // Newest-first, matching the server ordering.
    model.history.insert(0, entry);
    true
}

pub fn handle_toggle_history(model: &mut Model, ctx: &Context<Model>) -> bool {
    model.show_history = !model.show_history;
    if model.show_history {
        model.history_loading = true;
        load_history(ctx, model.user_id.clone());
    }
    true
}

fn load_history(ctx: &Context<Model>, user_id: String) {
    spawn_local({
        let link = ctx.link().clone();

        async move {
            let url = format!("/api/history/{}", user_id);
            match Request::get(&url).send().await {
                Ok(response) if response.ok() => {
                    match response.json::<Vec<ScanHistoryEntry>>().await {
                        Ok(entries) => link.send_message(Msg::HistoryLoaded(entries)),
                        Err(e) => {
                            log::error!("Failed to parse history: {}", e);
                            link.send_message(Msg::HistoryLoaded(Vec::new()));
                        }
                    }
                }
                Ok(response) => {
                    let status = response.status();
                    link.send_message(Msg::SetError(Some(format!(
                        "Could not load scan history (status {}).",
                        status
                    ))));
                    link.send_message(Msg::HistoryLoaded(Vec::new()));
                }
                Err(e) => {
                    link.send_message(Msg::SetError(Some(format!("Network error: {}", e))));
                    link.send_message(Msg::HistoryLoaded(Vec::new()));
                }
            }
        }
    });
}

pub fn handle_history_loaded(model: &mut Model, entries: Vec<ScanHistoryEntry>) -> bool {
    model.history = entries;
    model.history_loading = false;
    true
}

// Input events

pub fn handle_drop(model: &mut Model, ctx: &Context<Model>, event: DragEvent) -> bool {
    event.prevent_default();
    model.is_dragging = false;

    if let Some(data_transfer) = event.data_transfer() {
        if let Some(file_list) = data_transfer.files() {
            process_file_list(ctx, file_list);
        }
    }

    true
}

pub fn handle_paste(_model: &mut Model, ctx: &Context<Model>, event: ClipboardEvent) -> bool {
    if let Some(data_transfer) = event.clipboard_data() {
        if let Some(file_list) = data_transfer.files() {
            event.prevent_default();
            process_file_list(ctx, file_list);
            return true;
        }
    }
    false
}

/// One scan works on one photo; when several files arrive the first image
/// wins and the rest are ignored.
pub fn process_file_list(ctx: &Context<Model>, file_list: FileList) {
    let mut images = extract_image_files(&file_list);

    if images.is_empty() {
        if file_list.length() > 0 {
            ctx.link().send_message(Msg::SetError(Some(
                "No image file found in the selection.".into(),
            )));
        }
        return;
    }

    if images.len() > 1 {
        log::warn!("Multiple files dropped; scanning the first image only");
    }
    ctx.link().send_message(Msg::PhotoSelected(images.remove(0)));
}

fn farm_id_value(model: &Model) -> Option<String> {
    let trimmed = model.farm_id.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
