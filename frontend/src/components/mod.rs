//! Render helpers and update handlers for the scan UI.

pub mod fallback_picker;
pub mod handlers;
pub mod header;
pub mod history_view;
pub mod product_list;
pub mod result_card;
pub mod upload_section;
pub mod utils;
