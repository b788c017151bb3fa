//! Prompt assembly.
//!
//! Builds the LLM prompt from the transcript, the screen snapshot, and the
//! active application: a system header with the current situation, an
//! app-specific instruction block, and the screen content itself.

use chrono::{DateTime, Local};

/// Screen content longer than this is truncated inside the prompt.
const MAX_SCREEN_CONTENT: usize = 1500;

/// Build the full contextual prompt.
pub fn build_prompt(transcript: &str, screen_text: &str, app: &str) -> String {
    build_prompt_at(transcript, screen_text, app, Local::now())
}

fn build_prompt_at(transcript: &str, screen_text: &str, app: &str, now: DateTime<Local>) -> String {
    let time = now.format("%I:%M %p");
    let date = now.format("%A, %B %d, %Y");

    let system = format!(
        "You are Cluely, a helpful and proactive desktop AI assistant. You understand \
         context from what users say and what's visible on their screen.\n\n\
         Current Context:\n\
         - Time: {time}\n\
         - Date: {date}\n\
         - Active App: {app}\n\
         - User Said: \"{transcript}\"\n\n\
         Response Guidelines:\n\
         - Be helpful, concise, and actionable (2-4 sentences max)\n\
         - Directly address what the user asked about\n\
         - Use information from the screen when relevant\n\
         - Provide specific suggestions or explanations\n\
         - Be conversational and friendly, not robotic\n\
         - If screen text is unclear, focus on the user's question\n\n"
    );

    let context = context_section(app, transcript);
    let screen = screen_section(screen_text);

    format!("{system}{context}{screen}")
}

/// App-specific instruction block.
fn context_section(app: &str, transcript: &str) -> &'static str {
    let app_lower = app.to_lowercase();
    let audio_lower = transcript.to_lowercase();

    if app_lower.contains("twitter") || app_lower.contains("x.com") {
        if ["tweet", "post", "share"].iter().any(|w| audio_lower.contains(w)) {
            return "Context: User wants to create a tweet/post on Twitter/X.\n\n\
                    Instructions:\n\
                    - Suggest a compelling tweet based on screen content\n\
                    - Keep it under 280 characters\n\
                    - Make it engaging and authentic\n\
                    - Include relevant hashtags if appropriate\n\n";
        }
    }

    if matches!(app_lower.as_str(), "mail" | "gmail" | "outlook") || audio_lower.contains("email") {
        return "Context: User is working with email/messages.\n\n\
                Instructions:\n\
                - Help compose professional, clear communication\n\
                - Suggest appropriate tone based on context\n\
                - Offer template phrases if composing\n\
                - Suggest improvements if reviewing content\n\n";
    }

    if matches!(app_lower.as_str(), "word" | "docs" | "notion" | "obsidian" | "pages") {
        if audio_lower.contains("summarize") {
            return "Context: User wants to summarize content.\n\n\
                    Instructions:\n\
                    - Provide a concise summary of visible text\n\
                    - Highlight key points and main ideas\n\
                    - Keep the summary to 2-3 sentences\n\n";
        }
        return "Context: User is writing or editing documents.\n\n\
                Instructions:\n\
                - Suggest improvements to writing\n\
                - Help with clarity and flow\n\
                - Offer alternative phrasings\n\
                - Assist with structure and organization\n\n";
    }

    if matches!(app_lower.as_str(), "chrome" | "safari" | "firefox") {
        if ["chart", "graph", "data", "visualization", "plot"].iter().any(|w| audio_lower.contains(w)) {
            return "Context: User is asking about charts, graphs, or data visualizations on a web page.\n\n\
                    Instructions:\n\
                    - Focus on explaining the data and trends shown\n\
                    - Identify the type of chart/graph if possible\n\
                    - Point out key insights or patterns\n\
                    - Explain axes, labels, and data points if visible\n\n";
        }
        return "Context: User is browsing the web.\n\n\
                Instructions:\n\
                - Help explain or summarize web content\n\
                - Suggest related topics or actions\n\
                - Offer to extract key information\n\n";
    }

    if matches!(app_lower.as_str(), "vs code" | "vscode" | "cursor" | "xcode" | "terminal") {
        return "Context: User is coding or using development tools.\n\n\
                Instructions:\n\
                - Offer coding suggestions or explanations\n\
                - Help debug or improve code\n\
                - Suggest best practices\n\
                - Explain technical concepts if asked\n\n";
    }

    "Context: General assistance needed.\n\n\
     Instructions:\n\
     - Provide helpful, relevant suggestions\n\
     - Consider the user's current activity\n\
     - Offer actionable next steps\n\
     - Be proactive but not intrusive\n\n"
}

/// Screen content block, with a placeholder when there is nothing readable.
fn screen_section(screen_text: &str) -> String {
    let trimmed = screen_text.trim();
    if trimmed.len() < 10 {
        return "\nScreen Content: [No readable text detected]\n".to_string();
    }

    let mut content = trimmed.to_string();
    if content.len() > MAX_SCREEN_CONTENT {
        let mut cut = MAX_SCREEN_CONTENT;
        while !content.is_char_boundary(cut) {
            cut -= 1;
        }
        content.truncate(cut);
        content.push_str("...");
    }

    format!(
        "\nScreen Content (what user is currently viewing):\n\"{content}\"\n\n\
         Based on this screen content and the user's request, provide your response:\n"
    )
}

/// Prompt for reminder requests.
pub fn build_reminder_prompt(reminder_text: &str) -> String {
    let time = Local::now().format("%I:%M %p");

    format!(
        "You are Cluely, a desktop AI assistant. The user asked you to remind them about something.\n\n\
         User's reminder request: \"{reminder_text}\"\n\n\
         Create a helpful reminder message that:\n\
         - Clearly restates what they wanted to remember\n\
         - Is friendly and conversational\n\
         - Includes the current time for context\n\
         - Suggests any relevant next steps\n\n\
         Current time: {time}\n\n\
         Reminder message:"
    )
}

/// Prompt for answering questions.
pub fn build_question_prompt(question: &str, screen_text: &str, app: &str) -> String {
    let context_info = if screen_text.trim().len() > 10 { format!("\n\nContext from screen:\n{}", screen_text.trim()) } else { String::new() };

    format!(
        "You are Cluely, a helpful desktop AI assistant. The user asked a question while using {app}.\n\n\
         Question: \"{question}\"{context_info}\n\n\
         Provide a helpful, accurate answer that:\n\
         - Directly addresses their question\n\
         - Uses screen context if relevant\n\
         - Is concise but complete\n\
         - Offers additional help if appropriate\n\n\
         Answer:"
    )
}

/// Prompt for creative tasks (brainstorming, ideas).
pub fn build_creative_prompt(request: &str, screen_text: &str, app: &str) -> String {
    let context_info = if screen_text.trim().len() > 10 { format!("\n\nCurrent context:\n{}", screen_text.trim()) } else { String::new() };

    format!(
        "You are Cluely, a creative AI assistant. The user needs help with brainstorming or \
         creative thinking while using {app}.\n\n\
         Request: \"{request}\"{context_info}\n\n\
         Provide creative, actionable suggestions that:\n\
         - Are relevant to their current context\n\
         - Offer 3-5 concrete ideas\n\
         - Are practical and achievable\n\
         - Spark further creativity\n\n\
         Ideas:"
    )
}

/// Cap the prompt length, trimming the screen-content section first.
///
/// The screen block carries the least signal per character, so when the
/// prompt exceeds the budget the cut lands there and everything after it is
/// dropped.
pub fn optimize_prompt_length(prompt: &str, max_chars: usize) -> String {
    if prompt.len() <= max_chars {
        return prompt.to_string();
    }

    let mut optimized = String::with_capacity(max_chars);

    for line in prompt.lines() {
        if optimized.len() + line.len() > max_chars {
            if line.contains("Screen Content") {
                let remaining = max_chars.saturating_sub(optimized.len() + 50);
                if remaining > 100 {
                    let mut cut = remaining;
                    while !line.is_char_boundary(cut) {
                        cut -= 1;
                    }
                    optimized.push_str(&line[..cut]);
                    optimized.push_str("...\"");
                }
            }
            break;
        }
        optimized.push_str(line);
        optimized.push('\n');
    }

    optimized
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Local> {
        Local.with_ymd_and_hms(2024, 3, 15, 14, 30, 0).unwrap()
    }

    #[test]
    fn prompt_carries_situation_header() {
        let prompt = build_prompt_at("what is this error", "NullPointerException at line 42", "Terminal", fixed_now());
        assert!(prompt.contains("Active App: Terminal"));
        assert!(prompt.contains("User Said: \"what is this error\""));
        assert!(prompt.contains("02:30 PM"));
        assert!(prompt.contains("Friday, March 15, 2024"));
        assert!(prompt.contains("NullPointerException"));
    }

    #[test]
    fn development_apps_get_coding_instructions() {
        let prompt = build_prompt_at("how does this work", "fn main() {}", "Cursor", fixed_now());
        assert!(prompt.contains("coding or using development tools"));
    }

    #[test]
    fn tweet_requests_get_social_instructions() {
        let prompt = build_prompt_at("tweet about this", "rustlang trending", "Twitter", fixed_now());
        assert!(prompt.contains("under 280 characters"));
    }

    #[test]
    fn summarize_in_docs_switches_instructions() {
        let summarize = build_prompt_at("summarize this", "long text here over ten chars", "Notion", fixed_now());
        assert!(summarize.contains("summarize content"));

        let edit = build_prompt_at("make this flow better", "long text here over ten chars", "Notion", fixed_now());
        assert!(edit.contains("writing or editing documents"));
    }

    #[test]
    fn short_screen_text_gets_placeholder() {
        let prompt = build_prompt_at("help me", "x", "Unknown", fixed_now());
        assert!(prompt.contains("[No readable text detected]"));
    }

    #[test]
    fn long_screen_text_is_truncated() {
        let screen = "a".repeat(3000);
        let prompt = build_prompt_at("help me", &screen, "Unknown", fixed_now());
        assert!(prompt.contains("..."));
        assert!(prompt.len() < 3000);
    }

    #[test]
    fn question_prompt_includes_screen_only_when_useful() {
        let with = build_question_prompt("what is borrow checking", "rustc error E0502 explained here", "Chrome");
        assert!(with.contains("Context from screen"));

        let without = build_question_prompt("what is borrow checking", "", "Chrome");
        assert!(!without.contains("Context from screen"));
    }

    #[test]
    fn optimize_keeps_short_prompts_untouched() {
        let prompt = "short prompt";
        assert_eq!(optimize_prompt_length(prompt, 100), prompt);
    }

    #[test]
    fn optimize_cuts_at_screen_content() {
        let prompt = format!("header line\nScreen Content: \"{}\"\ntrailing instructions", "x".repeat(500));
        let optimized = optimize_prompt_length(&prompt, 300);
        assert!(optimized.len() <= 300);
        assert!(optimized.starts_with("header line"));
        assert!(!optimized.contains("trailing instructions"));
    }
}
