//! Conversion between canonical types and the `OpenAI` wire format

use crate::protocol::openai::{
    ChatChoice, ChatChunk, ChatRequest, ChatResponse, ChunkChoice, WireContent, WireFunction, WireFunctionCall,
    WireImageUrl, WireMessage, WirePart, WireTool, WireToolCall, WireUsage,
};
use crate::types::{
    Choice, ChoiceMessage, CompletionRequest, CompletionResponse, Content, ContentPart, FinishReason, Message,
    StreamDelta, StreamEvent, StreamToolCall, ToolChoice, ToolDefinition, Usage, build_tool_call,
};

// -- Outbound --

/// Streaming flags are left unset; the provider decides them per call
impl<'a> From<&'a CompletionRequest> for ChatRequest<'a> {
    fn from(req: &'a CompletionRequest) -> Self {
        let params = &req.params;

        Self {
            model: &req.model,
            messages: req.messages.iter().map(WireMessage::from).collect(),
            temperature: params.temperature,
            top_p: params.top_p,
            top_k: params.top_k,
            max_tokens: params.max_tokens,
            stop: params.stop.as_ref(),
            stream: None,
            stream_options: None,
            tools: req
                .tools
                .as_ref()
                .map(|tools| tools.iter().map(WireTool::from).collect()),
            tool_choice: req.tool_choice.as_ref().map(tool_choice_value),
        }
    }
}

impl<'a> From<&'a Message> for WireMessage<'a> {
    fn from(msg: &'a Message) -> Self {
        let content = match &msg.content {
            Content::Text(text) => WireContent::Text(text),
            Content::Parts(parts) => WireContent::Parts(parts.iter().map(WirePart::from).collect()),
        };

        let tool_calls = msg.tool_calls.as_ref().map(|calls| {
            calls
                .iter()
                .map(|call| WireToolCall {
                    id: &call.id,
                    kind: "function",
                    function: WireFunctionCall {
                        name: &call.function.name,
                        arguments: &call.function.arguments,
                    },
                })
                .collect()
        });

        Self {
            role: msg.role.as_str(),
            content,
            tool_calls,
            tool_call_id: msg.tool_call_id.as_deref(),
        }
    }
}

impl<'a> From<&'a ContentPart> for WirePart<'a> {
    fn from(part: &'a ContentPart) -> Self {
        match part {
            ContentPart::Text { text } => Self::Text { text },
            ContentPart::Image { url } => Self::ImageUrl {
                image_url: WireImageUrl { url },
            },
        }
    }
}

impl<'a> From<&'a ToolDefinition> for WireTool<'a> {
    fn from(tool: &'a ToolDefinition) -> Self {
        Self {
            kind: "function",
            function: WireFunction {
                name: &tool.name,
                description: tool.description.as_deref(),
                parameters: &tool.parameters,
            },
        }
    }
}

fn tool_choice_value(choice: &ToolChoice) -> serde_json::Value {
    match choice {
        ToolChoice::None => "none".into(),
        ToolChoice::Auto => "auto".into(),
        ToolChoice::Required => "required".into(),
        ToolChoice::Named(name) => serde_json::json!({
            "type": "function",
            "function": { "name": name }
        }),
    }
}

// -- Inbound --

impl From<ChatResponse> for CompletionResponse {
    fn from(resp: ChatResponse) -> Self {
        Self {
            id: resp.id,
            created: resp.created,
            model: resp.model,
            choices: resp.choices.into_iter().map(Choice::from).collect(),
            usage: resp.usage.map(Usage::from),
        }
    }
}

impl From<ChatChoice> for Choice {
    fn from(choice: ChatChoice) -> Self {
        let tool_calls = choice.message.tool_calls.map(|calls| {
            calls
                .into_iter()
                .map(|call| build_tool_call(call.id, call.function.name, call.function.arguments))
                .collect()
        });

        Self {
            index: choice.index,
            message: ChoiceMessage::new(choice.message.content, tool_calls),
            finish_reason: choice.finish_reason.as_deref().and_then(FinishReason::parse),
        }
    }
}

impl From<WireUsage> for Usage {
    fn from(usage: WireUsage) -> Self {
        Self {
            prompt_tokens: usage.prompt_tokens,
            completion_tokens: usage.completion_tokens,
            total_tokens: usage.total_tokens,
        }
    }
}

/// Canonical events carried by one stream frame
pub fn chunk_events(chunk: ChatChunk) -> Vec<StreamEvent> {
    let mut events: Vec<StreamEvent> = chunk
        .choices
        .into_iter()
        .flat_map(choice_deltas)
        .map(StreamEvent::Delta)
        .collect();

    if let Some(usage) = chunk.usage {
        events.push(StreamEvent::Usage(usage.into()));
    }

    events
}

/// One delta per tool-call fragment; text and finish reason ride on the first
fn choice_deltas(choice: ChunkChoice) -> Vec<StreamDelta> {
    let index = choice.index;
    let mut fragments = choice.delta.tool_calls.unwrap_or_default().into_iter().map(|call| {
        let (name, arguments) = call.function.map_or((None, None), |f| (f.name, f.arguments));
        StreamToolCall {
            index: call.index,
            id: call.id,
            name,
            arguments,
        }
    });

    let mut deltas = vec![StreamDelta {
        index,
        content: choice.delta.content,
        tool_call: fragments.next(),
        finish_reason: choice.finish_reason.as_deref().and_then(FinishReason::parse),
    }];
    deltas.extend(fragments.map(|fragment| StreamDelta {
        index,
        tool_call: Some(fragment),
        ..StreamDelta::default()
    }));

    deltas.retain(|delta| !delta.is_empty());
    deltas
}
