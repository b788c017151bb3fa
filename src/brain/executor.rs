//! Response presentation.
//!
//! Renders assistant responses as cards on the terminal. Presentation sits
//! behind the small [`Presenter`] type so a windowed front end can replace
//! it without touching the decision pipeline.

use std::time::Duration;

use tracing::debug;

/// Wrap width for response card bodies.
const CARD_WIDTH: usize = 60;

/// What kind of response is being shown; drives the card icon and title.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
    Suggestion,
    Reminder,
    Question,
    Action,
    Creative,
    SocialMedia,
    Communication,
    Writing,
    WebBrowsing,
    Development,
    Summary,
    Error,
}

impl ResponseKind {
    fn icon(self) -> &'static str {
        match self {
            ResponseKind::Suggestion => "💡",
            ResponseKind::Reminder => "⏰",
            ResponseKind::Question => "❓",
            ResponseKind::Action => "⚡",
            ResponseKind::Creative => "🎨",
            ResponseKind::SocialMedia => "📱",
            ResponseKind::Communication => "💬",
            ResponseKind::Writing => "📝",
            ResponseKind::WebBrowsing => "🌐",
            ResponseKind::Development => "💻",
            ResponseKind::Summary => "📄",
            ResponseKind::Error => "❌",
        }
    }

    fn title(self) -> &'static str {
        match self {
            ResponseKind::Suggestion => "Suggestion",
            ResponseKind::Reminder => "Reminder",
            ResponseKind::Question => "Answer",
            ResponseKind::Action => "Action",
            ResponseKind::Creative => "Ideas",
            ResponseKind::SocialMedia => "Social Media",
            ResponseKind::Communication => "Communication",
            ResponseKind::Writing => "Writing",
            ResponseKind::WebBrowsing => "Web",
            ResponseKind::Development => "Development",
            ResponseKind::Summary => "Summary",
            ResponseKind::Error => "Error",
        }
    }
}

/// A generated response ready for presentation.
#[derive(Debug, Clone)]
pub struct Response {
    pub text: String,
    pub kind: ResponseKind,
    /// `None` means the card should stay until the user moves on
    pub auto_dismiss: Option<Duration>,
}

/// Classify a response from the transcript and active app.
///
/// The checks run most-specific first: explicit verbs beat app defaults.
pub fn classify_response(transcript: &str, app: &str) -> ResponseKind {
    let audio = transcript.to_lowercase();
    let app_lower = app.to_lowercase();

    if audio.contains("remind") {
        ResponseKind::Reminder
    } else if ["tweet", "post", "share"].iter().any(|w| audio.contains(w)) && app_lower.contains("twitter") {
        ResponseKind::SocialMedia
    } else if audio.contains("summarize") || audio.contains("summary") {
        ResponseKind::Summary
    } else if ["what", "how", "why", "when", "where"].iter().any(|w| audio.contains(w)) {
        ResponseKind::Question
    } else if audio.contains("email") || matches!(app_lower.as_str(), "mail" | "gmail" | "outlook") {
        ResponseKind::Communication
    } else if matches!(app_lower.as_str(), "word" | "docs" | "notion" | "obsidian") {
        ResponseKind::Writing
    } else if matches!(app_lower.as_str(), "chrome" | "safari" | "firefox") {
        ResponseKind::WebBrowsing
    } else if matches!(app_lower.as_str(), "vs code" | "vscode" | "cursor" | "xcode" | "terminal") {
        ResponseKind::Development
    } else if ["idea", "brainstorm", "creative"].iter().any(|w| audio.contains(w)) {
        ResponseKind::Creative
    } else {
        ResponseKind::Suggestion
    }
}

/// Terminal presenter for response cards.
#[derive(Debug, Default)]
pub struct Presenter;

impl Presenter {
    pub fn new() -> Self {
        Self
    }

    /// Show a response card. Empty responses are silently skipped.
    pub fn show(&self, response: &Response) {
        if response.text.trim().is_empty() {
            debug!("No response text to display");
            return;
        }

        println!("{}", render_card(response));
    }

    /// Show an error card (5 second dismiss).
    pub fn show_error(&self, text: &str) {
        self.show(&Response { text: text.to_string(), kind: ResponseKind::Error, auto_dismiss: Some(Duration::from_secs(5)) });
    }
}

/// Render a response as a bordered card.
fn render_card(response: &Response) -> String {
    let header = format!(" {} {} ", response.kind.icon(), response.kind.title());
    let footer = match response.auto_dismiss {
        Some(d) if !d.is_zero() => format!(" dismisses in {}s ", d.as_secs()),
        _ => String::new(),
    };

    let mut out = String::new();
    out.push_str(&format!("\n╭─{}{}╮\n", header, "─".repeat(CARD_WIDTH.saturating_sub(header.chars().count()))));

    for line in wrap_text(response.text.trim(), CARD_WIDTH) {
        out.push_str(&format!("│ {:<width$} │\n", line, width = CARD_WIDTH));
    }

    out.push_str(&format!("╰─{}{}╯", footer, "─".repeat(CARD_WIDTH.saturating_sub(footer.chars().count()))));
    out
}

/// Greedy word wrap.
fn wrap_text(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();

    for paragraph in text.lines() {
        let mut current = String::new();

        for word in paragraph.split_whitespace() {
            if !current.is_empty() && current.chars().count() + 1 + word.chars().count() > width {
                lines.push(std::mem::take(&mut current));
            }

            if !current.is_empty() {
                current.push(' ');
            }

            // Hard-break words longer than the card itself
            if word.chars().count() > width {
                let mut rest: String = word.to_string();
                while rest.chars().count() > width {
                    let head: String = rest.chars().take(width).collect();
                    rest = rest.chars().skip(width).collect();
                    lines.push(head);
                }
                current.push_str(&rest);
            } else {
                current.push_str(word);
            }
        }

        if !current.is_empty() {
            lines.push(current);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reminders_win_over_app_defaults() {
        assert_eq!(classify_response("remind me to stretch", "Chrome"), ResponseKind::Reminder);
    }

    #[test]
    fn social_media_needs_both_verb_and_app() {
        assert_eq!(classify_response("tweet about this", "Twitter"), ResponseKind::SocialMedia);
        // Same words outside Twitter fall through to later rules
        assert_eq!(classify_response("tweet about this", "Notion"), ResponseKind::Writing);
    }

    #[test]
    fn question_words_classify_as_question() {
        assert_eq!(classify_response("how does this work", "Cursor"), ResponseKind::Question);
    }

    #[test]
    fn app_defaults_apply_without_verbs() {
        assert_eq!(classify_response("look at this", "Safari"), ResponseKind::WebBrowsing);
        assert_eq!(classify_response("check this out", "Terminal"), ResponseKind::Development);
        assert_eq!(classify_response("hmm", "Spotify"), ResponseKind::Suggestion);
    }

    #[test]
    fn summary_beats_writing_app() {
        assert_eq!(classify_response("summarize this doc", "Notion"), ResponseKind::Summary);
    }

    #[test]
    fn card_wraps_and_frames_text() {
        let response = Response {
            text: "A short suggestion.".to_string(),
            kind: ResponseKind::Suggestion,
            auto_dismiss: Some(Duration::from_secs(10)),
        };
        let card = render_card(&response);
        assert!(card.contains("💡 Suggestion"));
        assert!(card.contains("A short suggestion."));
        assert!(card.contains("dismisses in 10s"));
    }

    #[test]
    fn sticky_card_has_no_dismiss_note() {
        let response = Response { text: "Important!".to_string(), kind: ResponseKind::Reminder, auto_dismiss: None };
        assert!(!render_card(&response).contains("dismisses"));
    }

    #[test]
    fn wrap_text_respects_width() {
        let lines = wrap_text("one two three four five six seven eight nine ten", 15);
        assert!(lines.iter().all(|l| l.chars().count() <= 15));
        assert!(lines.len() > 2);
    }

    #[test]
    fn wrap_text_hard_breaks_long_words() {
        let lines = wrap_text(&"x".repeat(40), 15);
        assert!(lines.iter().all(|l| l.chars().count() <= 15));
    }
}
