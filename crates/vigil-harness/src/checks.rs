//! Contract checks over completion responses
//!
//! Every check is a pure function of the response and the request inputs it
//! needs; none of them construct or repair anything.

use vigil_llm::types::{FinishReason, StopSequences, ToolDefinition};
use vigil_llm::CompletionResponse;

use crate::error::{Check, ContractViolation};

/// The response has at least one choice
pub fn has_choices(response: &CompletionResponse) -> Result<(), ContractViolation> {
    if response.choices.is_empty() {
        return Err(ContractViolation::new(Check::HasChoices, "response has no choices"));
    }
    Ok(())
}

/// Choice 0 carries non-empty text
pub fn first_content_non_empty(response: &CompletionResponse) -> Result<(), ContractViolation> {
    has_choices(response)?;
    let choice = &response.choices[0];
    if choice.text().is_empty() {
        return Err(ContractViolation::new(
            Check::NonEmptyContent,
            format!("choice 0 has empty content (finish_reason: {:?})", choice.finish_reason),
        ));
    }
    Ok(())
}

/// Number of whitespace separated words
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Choice 0 has fewer than `max_words` words
pub fn word_count_below(response: &CompletionResponse, max_words: usize) -> Result<(), ContractViolation> {
    has_choices(response)?;
    let words = word_count(response.choices[0].text());
    if words >= max_words {
        return Err(ContractViolation::new(
            Check::WordLimit,
            format!("{words} words, expected fewer than {max_words}"),
        ));
    }
    Ok(())
}

/// Choice 0 ends with the first stop sequence when it stopped naturally
///
/// Any other finish reason passes; the model may hit the token limit before
/// reaching a stop sequence.
pub fn ends_with_stop(response: &CompletionResponse, stop: &StopSequences) -> Result<(), ContractViolation> {
    has_choices(response)?;
    let choice = &response.choices[0];
    if choice.finish_reason != Some(FinishReason::Stop) {
        return Ok(());
    }

    let Some(expected) = stop.first() else {
        return Ok(());
    };

    let text = choice.text();
    if !text.ends_with(expected) {
        let tail = text.char_indices().rev().nth(19).map_or(text, |(i, _)| &text[i..]);
        return Err(ContractViolation::new(
            Check::StopSequence,
            format!("content should end with {expected:?}, ends with {tail:?}"),
        ));
    }
    Ok(())
}

/// Identifier used to attribute a returned call to a requested tool
///
/// The first run of ASCII alphanumerics, so
/// `-DoSomethingVeryCool-forLitellm_Testin999229291-0293993` is keyed by
/// `DoSomethingVeryCool`.
pub fn attribution_key(name: &str) -> Option<&str> {
    name.split(|c: char| !c.is_ascii_alphanumeric()).find(|segment| !segment.is_empty())
}

/// Every tool call attributable to a requested tool names it exactly
///
/// A call naming any requested tool exactly is faithful. Otherwise it is
/// mangled if it carries the attribution key of a requested tool. Calls that
/// match no requested tool, and responses without tool calls, pass.
pub fn tool_names_faithful(response: &CompletionResponse, tools: &[ToolDefinition]) -> Result<(), ContractViolation> {
    for call in response.tool_calls() {
        let returned = call.function.name.as_str();
        if tools.iter().any(|tool| tool.name == returned) {
            continue;
        }

        let attributed = tools
            .iter()
            .find(|tool| attribution_key(&tool.name).is_some_and(|key| returned.contains(key)));

        if let Some(tool) = attributed {
            return Err(ContractViolation::new(
                Check::ToolNameFidelity,
                format!("tool call named {returned:?}, requested {:?}", tool.name),
            ));
        }
    }
    Ok(())
}
