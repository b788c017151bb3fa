//! Screen awareness: capture, OCR, and active-application detection.
//!
//! The screen is captured periodically, readable text is extracted with the
//! external `tesseract` tool, and the focused window is mapped to a
//! canonical application name. Results are published as a [`ScreenContext`]
//! snapshot for the decision stage.

mod capture;
mod parser;

pub use capture::{capture_screen, clean_ocr_text, get_screen_text, ocr_image, VisionError};
pub use parser::{detect_app_context, get_active_app, parse_app_name, window_titles, AppContext, ContextKind};

use std::time::Instant;

/// Snapshot of what is currently on screen.
#[derive(Debug, Clone)]
pub struct ScreenContext {
    /// Cleaned OCR text from the last capture
    pub text: String,
    /// Canonical name of the active application
    pub app: String,
    /// When the snapshot was taken
    pub captured_at: Instant,
}

impl Default for ScreenContext {
    fn default() -> Self {
        Self { text: String::new(), app: "Unknown".to_string(), captured_at: Instant::now() }
    }
}
