//! Trigger router.
//!
//! Decides whether a transcript, combined with what is on screen and which
//! application is active, should produce a response. Checks run in a fixed
//! order: direct activation phrases, then context-specific phrases, then
//! context-free intents. The first match wins.

use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

/// Built-in activation phrases: common mishearings of the assistant's name
/// plus imperative verbs that always deserve a response.
const BUILTIN_DIRECT_TRIGGERS: &[&str] = &[
    "hey cluey",
    "cluey",
    "hey chloe",
    "chloe",
    "hey clue",
    "clue",
    "suggest",
    "help me",
    "what should i",
    "generate",
    "create",
    "write",
    "compose",
];

const SOCIAL_TRIGGERS: &[&str] = &["tweet", "post", "share", "publish", "what should i tweet", "tweet about this", "social media", "share this"];

const EMAIL_TRIGGERS: &[&str] = &["reply", "respond", "email", "message", "write back", "send", "compose"];

const WRITING_TRIGGERS: &[&str] = &["summarize", "summary", "rewrite", "edit", "improve", "polish", "draft", "outline"];

const WEB_TRIGGERS: &[&str] = &["summarize this page", "what is this about", "explain this", "tldr", "summary"];

const QUESTION_KEYWORDS: &[&str] = &[
    "what",
    "how",
    "why",
    "when",
    "where",
    "who",
    "which",
    "explain",
    "tell me",
    "describe",
    "show me",
    "help me understand",
    "can you",
];

const ACTION_PHRASES: &[&str] = &["copy this", "copy that", "select all", "open", "close", "save", "delete", "search for", "find", "look up"];

const CREATIVE_PHRASES: &[&str] = &["brainstorm", "ideas", "creative", "inspiration", "alternatives", "options", "suggestions"];

const HIGH_PRIORITY_WORDS: &[&str] = &["urgent", "important", "asap", "quickly", "help", "error", "problem", "issue"];

const MEDIUM_PRIORITY_WORDS: &[&str] = &["please", "can you", "could you", "would you", "suggest", "recommend", "generate"];

const INTERRUPT_PHRASES: &[&str] = &["stop", "cancel", "never mind", "forget it", "wait", "hold on", "actually"];

/// Reminder phrasings; the capture group is the thing to remember.
static REMINDER_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"(?i)remind me (?:to )?(.+)",
        r"(?i)don't forget (?:to )?(.+)",
        r"(?i)remember (?:to )?(.+)",
        r"(?i)note that (.+)",
        r"(?i)make a note (.+)",
    ]
    .iter()
    .map(|p| Regex::new(p).expect("reminder pattern is valid"))
    .collect()
});

/// Context-free intent detected in a transcript.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntentKind {
    /// The user wants to remember something; the payload is what
    Reminder(String),
    Question,
    Action(String),
    Creative(String),
}

/// Why the router decided to respond.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Trigger {
    /// An activation phrase was heard
    Direct(String),
    /// A phrase that matters in the current app/screen context
    Context { domain: &'static str, phrase: String },
    /// A recognizable intent, independent of context
    Intent(IntentKind),
}

/// Response priority. High priority responses stay on screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Priority {
    High,
    Medium,
    Low,
}

/// Trigger router with the configured activation phrases.
pub struct Router {
    activation: Vec<String>,
}

impl Router {
    /// Create a router.
    ///
    /// # Arguments
    /// * `activation` - Configured direct-activation phrases (checked before
    ///   the built-in ones)
    pub fn new(activation: &[String]) -> Self {
        Self { activation: activation.iter().map(|p| p.to_lowercase()).collect() }
    }

    /// Decide whether to respond, and why.
    ///
    /// Returns `None` for silence and for transcripts that match nothing.
    pub fn should_respond(&self, transcript: &str, screen_text: &str, app: &str) -> Option<Trigger> {
        let audio = transcript.trim().to_lowercase();
        if audio.is_empty() {
            return None;
        }

        let app_lower = app.to_lowercase();

        // Direct activation: configured phrases first, then built-ins
        for phrase in self.activation.iter().map(String::as_str).chain(BUILTIN_DIRECT_TRIGGERS.iter().copied()) {
            if audio.contains(phrase) {
                debug!("🎯 Direct trigger: \"{}\"", phrase);
                return Some(Trigger::Direct(phrase.to_string()));
            }
        }

        if let Some(trigger) = context_trigger(&audio, &app_lower, screen_text) {
            debug!("🎯 Context trigger: {:?}", trigger);
            return Some(trigger);
        }

        if let Some(intent) = intent_trigger(&audio) {
            debug!("🎯 Intent trigger: {:?}", intent);
            return Some(Trigger::Intent(intent));
        }

        None
    }
}

/// Check for phrases that matter in the current app/screen context.
fn context_trigger(audio: &str, app: &str, screen_text: &str) -> Option<Trigger> {
    let screen_lower = screen_text.to_lowercase();

    // Social media context
    if matches!(app, "twitter" | "x.com") || screen_lower.contains("twitter") {
        if let Some(phrase) = first_match(audio, SOCIAL_TRIGGERS) {
            return Some(Trigger::Context { domain: "social_media", phrase });
        }
    }

    // Email/communication context
    if matches!(app, "mail" | "gmail" | "outlook") || ["email", "message", "reply"].iter().any(|w| screen_lower.contains(w)) {
        if let Some(phrase) = first_match(audio, EMAIL_TRIGGERS) {
            return Some(Trigger::Context { domain: "communication", phrase });
        }
    }

    // Document/writing context
    if matches!(app, "word" | "docs" | "notion" | "obsidian") || ["document", "note", "write"].iter().any(|w| screen_lower.contains(w)) {
        if let Some(phrase) = first_match(audio, WRITING_TRIGGERS) {
            return Some(Trigger::Context { domain: "writing", phrase });
        }
    }

    // Web browsing context
    if matches!(app, "chrome" | "safari" | "firefox") {
        if let Some(phrase) = first_match(audio, WEB_TRIGGERS) {
            return Some(Trigger::Context { domain: "web_browsing", phrase });
        }
    }

    None
}

/// Check for context-free intents.
fn intent_trigger(audio: &str) -> Option<IntentKind> {
    for pattern in REMINDER_PATTERNS.iter() {
        if let Some(caps) = pattern.captures(audio) {
            let detail = caps.get(1).map(|m| m.as_str().trim().to_string()).unwrap_or_default();
            return Some(IntentKind::Reminder(detail));
        }
    }

    if QUESTION_KEYWORDS.iter().any(|k| audio.contains(k)) {
        return Some(IntentKind::Question);
    }

    if let Some(phrase) = first_match(audio, ACTION_PHRASES) {
        return Some(IntentKind::Action(phrase));
    }

    if let Some(phrase) = first_match(audio, CREATIVE_PHRASES) {
        return Some(IntentKind::Creative(phrase));
    }

    None
}

/// Determine how urgent a response is.
pub fn priority(transcript: &str) -> Priority {
    let audio = transcript.to_lowercase();

    if HIGH_PRIORITY_WORDS.iter().any(|w| audio.contains(w)) {
        return Priority::High;
    }

    if MEDIUM_PRIORITY_WORDS.iter().any(|w| audio.contains(w)) {
        return Priority::Medium;
    }

    Priority::Low
}

/// Whether this transcript should cut off whatever is in flight.
pub fn should_interrupt(transcript: &str, priority: Priority) -> bool {
    if priority == Priority::High {
        return true;
    }

    let audio = transcript.to_lowercase();
    INTERRUPT_PHRASES.iter().any(|p| audio.contains(p))
}

fn first_match(audio: &str, phrases: &[&str]) -> Option<String> {
    phrases.iter().find(|p| audio.contains(*p)).map(|p| (*p).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn router() -> Router {
        Router::new(&["hey cluely".to_string(), "cluely".to_string()])
    }

    #[test]
    fn silence_never_triggers() {
        assert!(router().should_respond("", "", "Unknown").is_none());
        assert!(router().should_respond("   ", "", "Unknown").is_none());
    }

    #[test]
    fn configured_phrase_triggers_directly() {
        let trigger = router().should_respond("Hey Cluely, what's up?", "", "Unknown").unwrap();
        assert_eq!(trigger, Trigger::Direct("hey cluely".to_string()));
    }

    #[test]
    fn mishearing_still_triggers() {
        let trigger = router().should_respond("hey chloe can you look at this", "", "Unknown").unwrap();
        assert!(matches!(trigger, Trigger::Direct(p) if p == "hey chloe"));
    }

    #[test]
    fn social_context_requires_social_app_or_screen() {
        let r = router();
        let trigger = r.should_respond("tweet about this", "", "twitter").unwrap();
        assert!(matches!(trigger, Trigger::Context { domain: "social_media", .. }));

        // Same phrase on screen text mentioning twitter
        let trigger = r.should_respond("post this", "Twitter - Home timeline", "unknown").unwrap();
        assert!(matches!(trigger, Trigger::Context { domain: "social_media", .. }));
    }

    #[test]
    fn writing_context_in_notion() {
        let trigger = router().should_respond("polish this paragraph", "", "notion").unwrap();
        assert!(matches!(trigger, Trigger::Context { domain: "writing", phrase } if phrase == "polish"));
    }

    #[test]
    fn reminder_intent_captures_detail() {
        let trigger = router().should_respond("remind me to call mom at 3pm", "", "Unknown").unwrap();
        assert_eq!(trigger, Trigger::Intent(IntentKind::Reminder("call mom at 3pm".to_string())));

        let trigger = router().should_respond("don't forget the standup notes", "", "Unknown").unwrap();
        assert_eq!(trigger, Trigger::Intent(IntentKind::Reminder("the standup notes".to_string())));
    }

    #[test]
    fn question_intent_from_keywords() {
        let trigger = router().should_respond("explain recursion to me", "", "Unknown").unwrap();
        assert_eq!(trigger, Trigger::Intent(IntentKind::Question));
    }

    #[test]
    fn action_and_creative_intents() {
        let r = router();
        assert!(matches!(r.should_respond("search for rust traits", "", "Unknown"), Some(Trigger::Intent(IntentKind::Action(_)))));
        assert!(matches!(r.should_respond("brainstorm names for the project", "", "Unknown"), Some(Trigger::Intent(IntentKind::Creative(_)))));
    }

    #[test]
    fn unrelated_speech_is_ignored()  {
        assert!(router().should_respond("the weather is nice today", "", "Unknown").is_none());
    }

    #[test]
    fn priority_levels() {
        assert_eq!(priority("this is urgent, fix it"), Priority::High);
        assert_eq!(priority("could you recommend something"), Priority::Medium);
        assert_eq!(priority("tweet about rust"), Priority::Low);
    }

    #[test]
    fn interrupts_on_high_priority_or_cancel_words() {
        assert!(should_interrupt("whatever", Priority::High));
        assert!(should_interrupt("wait, never mind", Priority::Low));
        assert!(!should_interrupt("tweet about rust", Priority::Low));
    }
}
