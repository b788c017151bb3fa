//! Active-application detection and context classification.
//!
//! Maps the focused window's title to a canonical application name, and
//! classifies the application into a coarse context the router and the
//! response labeling understand.

use tracing::debug;
use xcap::Window;

/// Canonical name patterns, checked in order against the window title.
/// The needle is matched case-insensitively as a substring.
const APP_PATTERNS: &[(&str, &str)] = &[
    ("twitter", "Twitter"),
    ("chrome", "Chrome"),
    ("safari", "Safari"),
    ("firefox", "Firefox"),
    ("slack", "Slack"),
    ("discord", "Discord"),
    ("zoom", "Zoom"),
    ("microsoft word", "Word"),
    ("microsoft excel", "Excel"),
    ("powerpoint", "PowerPoint"),
    ("notion", "Notion"),
    ("obsidian", "Obsidian"),
    ("vs code", "VS Code"),
    ("visual studio code", "VS Code"),
    ("cursor", "Cursor"),
    ("iterm", "Terminal"),
    ("terminal", "Terminal"),
    ("finder", "Finder"),
    ("mail", "Mail"),
    ("messages", "Messages"),
    ("calendar", "Calendar"),
    ("notes", "Notes"),
];

/// Coarse application context.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContextKind {
    SocialMedia,
    WebBrowsing,
    Communication,
    Productivity,
    Development,
    General,
}

impl std::fmt::Display for ContextKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let label = match self {
            ContextKind::SocialMedia => "social_media",
            ContextKind::WebBrowsing => "web_browsing",
            ContextKind::Communication => "communication",
            ContextKind::Productivity => "productivity",
            ContextKind::Development => "development",
            ContextKind::General => "general",
        };
        write!(f, "{}", label)
    }
}

/// What the user is doing, as far as the window manager can tell.
#[derive(Debug, Clone)]
pub struct AppContext {
    pub app: String,
    pub kind: ContextKind,
    /// Extra signal when available: composing vs. browsing, or the page name
    pub detail: Option<String>,
}

/// Get the canonical name of the currently focused application.
///
/// Returns `"Unknown"` when no window is focused or the probe fails, so the
/// pipeline keeps running on systems where window metadata is unavailable.
pub fn get_active_app() -> String {
    match focused_window() {
        Some((app_name, title)) => {
            // Window titles usually carry more signal than process names
            let parsed = parse_app_name(&title);
            let name = if parsed == "Unknown" && !app_name.is_empty() { app_name } else { parsed };
            debug!("🖥️ Active app: {}", name);
            name
        }
        None => {
            debug!("🖥️ No active window detected");
            "Unknown".to_string()
        }
    }
}

/// Titles of all visible windows. Used by the self-test.
pub fn window_titles() -> Vec<String> {
    let Ok(windows) = Window::all() else {
        return Vec::new();
    };

    windows.iter().filter_map(|w| w.title().ok()).filter(|t| !t.trim().is_empty()).collect()
}

/// The focused window's (app name, title), if any.
fn focused_window() -> Option<(String, String)> {
    let windows = Window::all().ok()?;
    let focused = windows.into_iter().find(|w| w.is_focused().unwrap_or(false))?;
    let app_name = focused.app_name().unwrap_or_default();
    let title = focused.title().unwrap_or_default();
    Some((app_name, title))
}

/// Parse a canonical application name from a window title.
pub fn parse_app_name(window_title: &str) -> String {
    if window_title.trim().is_empty() {
        return "Unknown".to_string();
    }

    let title_lower = window_title.to_lowercase();
    for (needle, canonical) in APP_PATTERNS {
        if title_lower.contains(needle) {
            return (*canonical).to_string();
        }
    }

    // No pattern matched: take the first title segment and strip common suffixes
    let mut cleaned = window_title.split(" - ").next().unwrap_or(window_title);
    cleaned = cleaned.split(" | ").next().unwrap_or(cleaned);

    let mut cleaned = cleaned.to_string();
    for suffix in [".app", ".exe", " (Beta)", " (Alpha)"] {
        cleaned = cleaned.replace(suffix, "");
    }

    let cleaned = cleaned.trim();
    if cleaned.is_empty() { "Unknown".to_string() } else { cleaned.to_string() }
}

/// Classify the application into a coarse context.
pub fn detect_app_context(app_name: &str, window_title: &str) -> AppContext {
    let app_lower = app_name.to_lowercase();
    let title_lower = window_title.to_lowercase();

    let (kind, detail) = if app_lower.contains("twitter") || title_lower.contains("x.com") {
        let detail = if title_lower.contains("compose") || title_lower.contains("tweet") {
            Some("composing".to_string())
        } else if title_lower.contains("home") || title_lower.contains("timeline") {
            Some("browsing".to_string())
        } else {
            None
        };
        (ContextKind::SocialMedia, detail)
    } else if matches!(app_lower.as_str(), "chrome" | "safari" | "firefox") {
        // Try to extract the page name from "Page - Browser" style titles
        let detail = window_title.split(" - ").next().filter(|page| !page.trim().is_empty() && *page != window_title).map(|page| page.trim().to_string());
        (ContextKind::WebBrowsing, detail)
    } else if matches!(app_lower.as_str(), "slack" | "discord" | "messages" | "mail") {
        (ContextKind::Communication, Some(app_name.to_string()))
    } else if matches!(app_lower.as_str(), "word" | "excel" | "powerpoint" | "notion" | "obsidian") {
        (ContextKind::Productivity, Some(app_name.to_string()))
    } else if matches!(app_lower.as_str(), "vs code" | "cursor" | "terminal" | "xcode") {
        (ContextKind::Development, Some(app_name.to_string()))
    } else {
        (ContextKind::General, None)
    };

    debug!("🔍 App context: {} in {}", kind, app_name);

    AppContext { app: app_name.to_string(), kind, detail }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_names_from_titles() {
        assert_eq!(parse_app_name("Home / Twitter"), "Twitter");
        assert_eq!(parse_app_name("Rust docs - Google Chrome"), "Chrome");
        assert_eq!(parse_app_name("my-crate - Visual Studio Code"), "VS Code");
        assert_eq!(parse_app_name("iTerm2"), "Terminal");
    }

    #[test]
    fn unknown_titles_fall_back_to_first_segment() {
        assert_eq!(parse_app_name("Blender - untitled.blend"), "Blender");
        assert_eq!(parse_app_name("MyTool.app"), "MyTool");
        assert_eq!(parse_app_name("Editor (Beta) | workspace"), "Editor");
        assert_eq!(parse_app_name(""), "Unknown");
        assert_eq!(parse_app_name("   "), "Unknown");
    }

    #[test]
    fn classifies_browser_context_with_page_detail() {
        let ctx = detect_app_context("Chrome", "Rust Programming Language - Google Chrome");
        assert_eq!(ctx.kind, ContextKind::WebBrowsing);
        assert_eq!(ctx.detail.as_deref(), Some("Rust Programming Language"));
    }

    #[test]
    fn classifies_social_media_compose() {
        let ctx = detect_app_context("Twitter", "Compose new post / X");
        assert_eq!(ctx.kind, ContextKind::SocialMedia);
        assert_eq!(ctx.detail.as_deref(), Some("composing"));
    }

    #[test]
    fn classifies_development_and_general() {
        assert_eq!(detect_app_context("Cursor", "main.rs").kind, ContextKind::Development);
        assert_eq!(detect_app_context("Spotify", "Now playing").kind, ContextKind::General);
    }
}
