//! System prompt for the spoken assistant.
//!
//! Replies are read aloud, so the prompt asks for short answers without
//! formatting, and warns the model that user messages come from
//! speech recognition.

const SYSTEM_PROMPT_BASE: &str = "\
You are a speech chatbot.
Respond to the user's messages with short and concise words.
Show empathy and understanding.
Until it is requested, don't describe instructions or provide help.
The user's messages are coming from voice-to-text, so they may be a bit messy.
Do not use Markdown, lists or emoji: your reply is read aloud.";

/// Build the system prompt for replies in `language`.
///
/// Common ISO-639-1 codes are spelled out so the model does not have to
/// guess; any other value is passed through as is.
///
/// ```rust
/// use voice_chat::llm::system_prompt;
///
/// let p = system_prompt("ja");
/// assert!(p.starts_with("You are a speech chatbot."));
/// assert!(p.ends_with("Response must be in Japanese."));
/// ```
pub fn system_prompt(language: &str) -> String {
    format!(
        "{SYSTEM_PROMPT_BASE}\n\nResponse must be in {}.",
        language_name(language)
    )
}

fn language_name(code: &str) -> &str {
    match code.trim().to_ascii_lowercase().as_str() {
        "en" => "English",
        "ja" => "Japanese",
        "th" => "Thai",
        "de" => "German",
        "fr" => "French",
        "es" => "Spanish",
        "zh" => "Chinese",
        "ko" => "Korean",
        "hi" => "Hindi",
        _ => code,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_code_is_spelled_out() {
        assert!(system_prompt("EN").ends_with("Response must be in English."));
    }

    #[test]
    fn unknown_code_passes_through() {
        assert!(system_prompt("Esperanto").ends_with("Response must be in Esperanto."));
    }

    #[test]
    fn prompt_mentions_speech() {
        let p = system_prompt("en");
        assert!(p.contains("voice-to-text"));
        assert!(p.contains("short and concise"));
    }
}
