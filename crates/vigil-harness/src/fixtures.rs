//! Shared, immutable inputs for the contract cases

use serde_json::json;
use vigil_llm::types::{Message, StopSequences, ToolDefinition};

/// Default user prompt for the text cases
pub const USER_PROMPT: &str = "Write a short poem about the sky";

/// System prompt for the non-streaming system case
pub const SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// System prompt for the streaming system case
pub const STREAMING_SYSTEM_PROMPT: &str = "You are a helpful assistant. You respond in french";

/// Token limit for the text cases
pub const TEXT_MAX_TOKENS: u32 = 10;

/// Temperature for the text cases
pub const TEXT_TEMPERATURE: f64 = 0.1;

/// Text sent next to every image
pub const IMAGE_PROMPT: &str = "Whats in this image?";

/// User prompt for the tool-calling case
pub const WEATHER_PROMPT: &str = "What's the weather like in Boston today in Fahrenheit?";

/// Tool name with characters Bedrock rejects on the wire
pub const WEATHER_TOOL_NAME: &str = "-DoSomethingVeryCool-forLitellm_Testin999229291-0293993";

/// Default conversation for the text cases
pub fn default_messages() -> Vec<Message> {
    vec![Message::user(USER_PROMPT)]
}

/// The weather tool offered in the tool-calling case
pub fn weather_tool() -> ToolDefinition {
    ToolDefinition::new(
        WEATHER_TOOL_NAME,
        "use this to get the current weather",
        json!({"type": "object", "properties": {}}),
    )
}

/// Prompt plus the stop sequences it is sent with
#[derive(Debug, Clone)]
pub struct StopCase {
    /// Short label used in case names
    pub label: &'static str,
    pub prompt: &'static str,
    pub stop: StopSequences,
}

/// The four stop-sequence cases
pub fn stop_cases() -> Vec<StopCase> {
    vec![
        StopCase {
            label: "markdown_fence",
            prompt: "count to ten with numerals within a markdown block, then explain what you did",
            stop: StopSequences::from("```"),
        },
        StopCase {
            label: "closing_tag",
            prompt: "count to 10 with numerals, one line at a time starting with <tool> and when done end in </tool>, then explain what you did",
            stop: StopSequences::from("</tool>"),
        },
        StopCase {
            label: "single_digit",
            prompt: "count from 1 to 10 with numerals",
            stop: StopSequences::from("5"),
        },
        StopCase {
            label: "digit_list",
            prompt: "count from 1 to 10 with numerals, do not explain yourself just start counting",
            stop: StopSequences::from(vec!["5".to_owned(), "10".to_owned()]),
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn weather_tool_keeps_its_raw_name() {
        let tool = weather_tool();
        assert_eq!(tool.name, WEATHER_TOOL_NAME);
        assert!(!vigil_llm::tool_names::is_valid_tool_name(WEATHER_TOOL_NAME));
    }

    #[test]
    fn stop_cases_cover_both_shapes() {
        let cases = stop_cases();
        assert_eq!(cases.len(), 4);
        assert!(matches!(cases[2].stop, StopSequences::One(_)));
        assert_eq!(cases[3].stop.first(), Some("5"));
        assert_eq!(cases[3].stop.as_slice().len(), 2);
    }
}
