use gloo_events::EventListener;
use gloo_file::{File as GlooFile, ObjectUrl};
use shared::{
    AnalysisResult, DiseaseReference, EncodedImage, ProductRecommendation, ScanEvent,
    ScanHistoryEntry, ScanPhase,
};
use wasm_bindgen::JsCast;
use web_sys::{ClipboardEvent, DragEvent};
use yew::prelude::*;

mod components;

use components::fallback_picker::render_fallback_picker;
use components::handlers;
use components::header::render_header;
use components::history_view::{render_history_toggle, render_history_view};
use components::product_list::render_product_list;
use components::result_card::render_result_card;
use components::upload_section::render_upload_section;
use components::utils::{anonymous_user_id, render_error_message};

// Models
#[derive(Clone)]
struct PhotoData {
    file: GlooFile,
    preview_url: Option<ObjectUrl>,
}

// Yew msg components
enum Msg {
    // Photo selection
    PhotoSelected(GlooFile),
    AddPreview(ObjectUrl),
    PhotoEncoded(EncodedImage),
    PhotoRejected(String),
    ClearPhoto,

    // Scan flow
    Analyze,
    Scan(ScanEvent),

    // Lookups
    ProductsLoaded(u32, Vec<ProductRecommendation>),

    // History
    SaveScan,
    ScanSaved(ScanHistoryEntry),
    ToggleHistory,
    HistoryLoaded(Vec<ScanHistoryEntry>),

    // UI states
    SetFarmId(String),
    SetError(Option<String>),
    SetDragging(bool),

    // Input events
    HandleDrop(DragEvent),
    HandlePaste(ClipboardEvent),
}

// Main component
struct Model {
    photo: Option<PhotoData>,
    encoded: Option<EncodedImage>,
    uploading: bool,
    scan: ScanPhase,
    /// Counter identifying the current scan attempt; responses tagged with
    /// an older value are dropped.
    scan_token: u32,
    farm_id: String,
    user_id: String,
    products: Vec<ProductRecommendation>,
    products_loaded: bool,
    history: Vec<ScanHistoryEntry>,
    show_history: bool,
    history_loading: bool,
    saved_entry_id: Option<String>,
    error: Option<String>,
    is_dragging: bool,
    paste_listener: Option<EventListener>,
}

impl Model {
    fn result(&self) -> Option<&AnalysisResult> {
        self.scan.result()
    }

    fn fallback_candidates(&self) -> Option<(&str, &[DiseaseReference])> {
        match &self.scan {
            ScanPhase::FallbackOffered { reason, candidates } => {
                Some((reason.as_str(), candidates.as_slice()))
            }
            _ => None,
        }
    }
}

// Yew component implementation
impl Component for Model {
    type Message = Msg;
    type Properties = ();

    fn create(ctx: &Context<Self>) -> Self {
        let mut model = Self {
            photo: None,
            encoded: None,
            uploading: false,
            scan: ScanPhase::Idle,
            scan_token: 0,
            farm_id: String::new(),
            user_id: anonymous_user_id(),
            products: Vec::new(),
            products_loaded: false,
            history: Vec::new(),
            show_history: false,
            history_loading: false,
            saved_entry_id: None,
            error: None,
            is_dragging: false,
            paste_listener: None,
        };

        let link = ctx.link().clone();
        let window = web_sys::window().expect("no global `window` exists");
        let listener = EventListener::new(&window, "paste", move |event| {
            if let Some(clipboard_event) = event.dyn_ref::<ClipboardEvent>() {
                link.send_message(Msg::HandlePaste(clipboard_event.clone()));
            }
        });
        model.paste_listener = Some(listener);

        model
    }

    fn update(&mut self, ctx: &Context<Self>, msg: Self::Message) -> bool {
        match msg {
            // Photo selection
            Msg::PhotoSelected(file) => handlers::handle_photo_selected(self, ctx, file),
            Msg::AddPreview(url) => handlers::handle_add_preview(self, url),
            Msg::PhotoEncoded(encoded) => handlers::handle_photo_encoded(self, encoded),
            Msg::PhotoRejected(reason) => handlers::handle_photo_rejected(self, reason),
            Msg::ClearPhoto => handlers::handle_clear_photo(self),

            // Scan flow
            Msg::Analyze => handlers::handle_analyze(self, ctx),
            Msg::Scan(event) => handlers::handle_scan_event(self, ctx, event),

            // Lookups
            Msg::ProductsLoaded(token, products) => {
                handlers::handle_products_loaded(self, token, products)
            }

            // History
            Msg::SaveScan => handlers::handle_save_scan(self, ctx),
            Msg::ScanSaved(entry) => handlers::handle_scan_saved(self, entry),
            Msg::ToggleHistory => handlers::handle_toggle_history(self, ctx),
            Msg::HistoryLoaded(entries) => handlers::handle_history_loaded(self, entries),

            // UI states
            Msg::SetFarmId(farm_id) => {
                self.farm_id = farm_id;
                false
            }
            Msg::SetError(error) => {
                self.error = error;
                true
            }
            Msg::SetDragging(is_dragging) => {
                self.is_dragging = is_dragging;
                true
            }

            // Input events
            Msg::HandleDrop(event) => handlers::handle_drop(self, ctx, event),
            Msg::HandlePaste(event) => handlers::handle_paste(self, ctx, event),
        }
    }

    fn view(&self, ctx: &Context<Self>) -> Html {
        html! {
            <div class="container">
                { render_header() }
                { render_history_toggle(self, ctx.link()) }

                <main class="main-content">
                { render_upload_section(self, ctx) }
                { render_error_message(self) }
                { self.render_scan_flow(ctx) }
                { render_history_view(self) }
                </main>

                <footer class="app-footer">
                    <p>{"CropGuard | Fullstack Rust WASM"}</p>
                </footer>
            </div>
        }
    }
}

impl Model {
    fn render_scan_flow(&self, ctx: &Context<Self>) -> Html {
        match &self.scan {
            ScanPhase::Idle => html! {},
            ScanPhase::Requesting { .. } => html! {
                <div class="scan-progress">
                    <i class="fa-solid fa-spinner fa-spin fa-2x"></i>
                    <p>{"Analyzing your crop photo..."}</p>
                </div>
            },
            ScanPhase::Failed { reason } => html! {
                <div class="scan-progress">
                    <i class="fa-solid fa-spinner fa-spin"></i>
                    <p>{ format!("Analysis failed ({}). Loading the disease reference list...", reason) }</p>
                </div>
            },
            ScanPhase::FallbackOffered { .. } => render_fallback_picker(self, ctx),
            ScanPhase::Succeeded(_) | ScanPhase::ResolvedByUser(_) => html! {
                <>
                    { render_result_card(self, ctx) }
                    { render_product_list(self) }
                </>
            },
        }
    }
}

fn main() {
    wasm_logger::init(wasm_logger::Config::default());
    log::info!("App starting...");
    yew::Renderer::<Model>::new().render();
}
