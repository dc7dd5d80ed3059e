//! AWS Bedrock provider using the Converse API
//!
//! Nova models are reached through `Converse` and `ConverseStream`. Beyond the
//! plain type mapping this provider smooths over three Bedrock quirks so the
//! caller sees OpenAI-style behaviour:
//!
//! - tool names outside `[a-zA-Z][a-zA-Z0-9_]*` are encoded on the way out and
//!   decoded on the way back ([`ToolNameMap`])
//! - the matched stop sequence, which Bedrock strips, is re-appended
//! - `top_k` travels in `additionalModelRequestFields`

use std::collections::HashMap;

use async_trait::async_trait;
use aws_sdk_bedrockruntime::Client as BedrockClient;
use aws_sdk_bedrockruntime::error::{DisplayErrorContext, ProvideErrorMetadata};
use aws_sdk_bedrockruntime::primitives::event_stream::EventReceiver;
use aws_sdk_bedrockruntime::types::error::ConverseStreamOutputError;
use aws_sdk_bedrockruntime::types::{
    AnyToolChoice, AutoToolChoice, ContentBlock, ContentBlockDelta, ContentBlockStart, ConversationRole,
    ConverseOutput, ConverseStreamOutput, ImageBlock, ImageFormat, ImageSource, InferenceConfiguration,
    Message as BedrockMessage, SpecificToolChoice, StopReason, SystemContentBlock, TokenUsage, Tool,
    ToolChoice as BedrockToolChoice, ToolConfiguration, ToolInputSchema, ToolResultBlock, ToolResultContentBlock,
    ToolSpecification, ToolUseBlock,
};
use aws_smithy_types::{Blob, Document, Number};
use base64::Engine;
use secrecy::ExposeSecret;
use vigil_config::{BedrockConfig, LlmProviderConfig, LlmProviderType};

use super::{CompletionStream, Provider, ProviderCapabilities};
use crate::error::LlmError;
use crate::stop::{missing_stop_suffix, restore_stop_sequence};
use crate::tool_names::ToolNameMap;
use crate::types::{
    Choice, ChoiceMessage, CompletionRequest, CompletionResponse, Content, ContentPart, FinishReason, Message, Role,
    StreamDelta, StreamEvent, StreamToolCall, ToolCall, ToolChoice, Usage, build_tool_call, unix_now,
};

/// AWS Bedrock provider using the Converse API
pub struct BedrockProvider {
    name: String,
    client: BedrockClient,
}

impl BedrockProvider {
    /// Create from provider configuration
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Internal` if the provider type is not Bedrock.
    pub async fn new(name: String, config: &LlmProviderConfig) -> Result<Self, LlmError> {
        let LlmProviderType::Bedrock(bedrock_config) = &config.provider_type else {
            return Err(LlmError::Internal(anyhow::anyhow!("expected bedrock provider type")));
        };

        let client = build_bedrock_client(bedrock_config).await;

        Ok(Self { name, client })
    }
}

/// Build a Bedrock runtime client, preferring explicit credentials over the default chain
async fn build_bedrock_client(config: &BedrockConfig) -> BedrockClient {
    let mut loader = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(aws_config::Region::new(config.region.clone()));

    if let (Some(access_key), Some(secret_key)) = (&config.access_key_id, &config.secret_access_key) {
        let credentials = aws_credential_types::Credentials::new(
            access_key.expose_secret(),
            secret_key.expose_secret(),
            None,
            None,
            "vigil-config",
        );
        loader = loader.credentials_provider(credentials);
    }

    BedrockClient::new(&loader.load().await)
}

/// Everything a Converse call needs, derived once from the canonical request
struct ConverseInput {
    system: Vec<SystemContentBlock>,
    messages: Vec<BedrockMessage>,
    inference: InferenceConfiguration,
    tool_config: Option<ToolConfiguration>,
    additional_fields: Option<Document>,
    names: ToolNameMap,
}

impl ConverseInput {
    fn from_request(request: &CompletionRequest) -> Result<Self, LlmError> {
        let names = request
            .tools
            .as_deref()
            .map(ToolNameMap::from_tools)
            .unwrap_or_default();
        if !names.is_identity() {
            tracing::debug!(tools = ?names, "tool names encoded for bedrock");
        }

        let (system, messages) = build_converse_messages(&request.messages, &names)?;

        Ok(Self {
            system,
            messages,
            inference: build_inference_config(request),
            tool_config: build_tool_config(request, &names)?,
            additional_fields: additional_request_fields(request),
            names,
        })
    }
}

#[async_trait]
impl Provider for BedrockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn capabilities(&self) -> ProviderCapabilities {
        ProviderCapabilities {
            streaming: true,
            tool_calling: true,
            vision: true,
        }
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let input = ConverseInput::from_request(request)?;

        let output = self
            .client
            .converse()
            .model_id(&request.model)
            .set_system(Some(input.system))
            .set_messages(Some(input.messages))
            .inference_config(input.inference)
            .set_tool_config(input.tool_config)
            .set_additional_model_request_fields(input.additional_fields)
            .send()
            .await
            .map_err(|e| {
                let err = classify_error(e.code(), DisplayErrorContext(&e).to_string(), false);
                tracing::error!(
                    provider = %self.name,
                    code = e.code().unwrap_or("none"),
                    error = %err,
                    "bedrock converse failed"
                );
                err
            })?;

        let stop_reason = output.stop_reason();
        let (mut text, tool_calls) = match output.output() {
            Some(ConverseOutput::Message(msg)) => extract_bedrock_response(msg, &input.names),
            _ => (String::new(), Vec::new()),
        };

        if *stop_reason == StopReason::StopSequence {
            let matched = matched_stop_sequence(output.additional_model_response_fields());
            restore_stop_sequence(&mut text, request.stop_sequences(), matched.as_deref());
        }

        let message = ChoiceMessage::new(
            (!text.is_empty()).then_some(text),
            (!tool_calls.is_empty()).then_some(tool_calls),
        );

        Ok(CompletionResponse {
            id: format!("bedrock-{}", uuid::Uuid::new_v4()),
            created: unix_now(),
            model: request.model.clone(),
            choices: vec![Choice {
                index: 0,
                message,
                finish_reason: Some(map_stop_reason(stop_reason)),
            }],
            usage: output.usage().map(map_usage),
        })
    }

    async fn complete_stream(&self, request: &CompletionRequest) -> Result<CompletionStream, LlmError> {
        let input = ConverseInput::from_request(request)?;

        let output = self
            .client
            .converse_stream()
            .model_id(&request.model)
            .set_system(Some(input.system))
            .set_messages(Some(input.messages))
            .inference_config(input.inference)
            .set_tool_config(input.tool_config)
            .set_additional_model_request_fields(input.additional_fields)
            .send()
            .await
            .map_err(|e| {
                let err = classify_error(e.code(), DisplayErrorContext(&e).to_string(), false);
                tracing::error!(
                    provider = %self.name,
                    code = e.code().unwrap_or("none"),
                    error = %err,
                    "bedrock converse_stream failed"
                );
                err
            })?;

        let state = StreamState {
            receiver: output.stream,
            translator: StreamTranslator::new(input.names, request.stop_sequences().to_vec()),
            finished: false,
        };

        let stream = futures_util::stream::unfold(state, |mut state| async move {
            if state.finished {
                return None;
            }

            loop {
                match state.receiver.recv().await {
                    Ok(Some(event)) => {
                        if let Some(event) = state.translator.translate(event) {
                            return Some((Ok(event), state));
                        }
                    }
                    Ok(None) => return None,
                    Err(e) => {
                        state.finished = true;
                        let err = classify_error(e.code(), DisplayErrorContext(&e).to_string(), true);
                        tracing::warn!(code = e.code().unwrap_or("none"), error = %err, "bedrock stream failed");
                        return Some((Err(err), state));
                    }
                }
            }
        });

        Ok(Box::pin(stream))
    }
}

struct StreamState {
    receiver: EventReceiver<ConverseStreamOutput, ConverseStreamOutputError>,
    translator: StreamTranslator,
    finished: bool,
}

/// Turns `ConverseStream` events into canonical stream events
///
/// Tracks streamed text so a stripped stop sequence can be restored in the
/// terminal delta, and maps Bedrock content-block indices to tool-call indices.
struct StreamTranslator {
    names: ToolNameMap,
    stop: Vec<String>,
    text: String,
    tool_indices: HashMap<i32, u32>,
}

impl StreamTranslator {
    fn new(names: ToolNameMap, stop: Vec<String>) -> Self {
        Self {
            names,
            stop,
            text: String::new(),
            tool_indices: HashMap::new(),
        }
    }

    fn translate(&mut self, event: ConverseStreamOutput) -> Option<StreamEvent> {
        match event {
            ConverseStreamOutput::ContentBlockStart(start) => match start.start() {
                Some(ContentBlockStart::ToolUse(tool)) => {
                    let index = u32::try_from(self.tool_indices.len()).unwrap_or(u32::MAX);
                    self.tool_indices.insert(start.content_block_index(), index);

                    Some(StreamEvent::Delta(StreamDelta::tool_call(StreamToolCall::start(
                        index,
                        tool.tool_use_id(),
                        self.names.decode(tool.name()),
                    ))))
                }
                _ => None,
            },
            ConverseStreamOutput::ContentBlockDelta(delta) => match delta.delta() {
                Some(ContentBlockDelta::Text(text)) if !text.is_empty() => {
                    self.text.push_str(text);
                    Some(StreamEvent::Delta(StreamDelta::text(text.clone())))
                }
                Some(ContentBlockDelta::ToolUse(tool)) => {
                    let index = self.tool_indices.get(&delta.content_block_index()).copied()?;
                    Some(StreamEvent::Delta(StreamDelta::tool_call(StreamToolCall::arguments(
                        index,
                        tool.input(),
                    ))))
                }
                _ => None,
            },
            ConverseStreamOutput::MessageStop(stop) => {
                let mut delta = StreamDelta::finish(map_stop_reason(stop.stop_reason()));
                if *stop.stop_reason() == StopReason::StopSequence {
                    let matched = matched_stop_sequence(stop.additional_model_response_fields());
                    delta.content =
                        missing_stop_suffix(&self.text, &self.stop, matched.as_deref()).map(str::to_owned);
                }
                Some(StreamEvent::Delta(delta))
            }
            ConverseStreamOutput::Metadata(meta) => meta.usage().map(|u| StreamEvent::Usage(map_usage(u))),
            _ => None,
        }
    }
}

/// Map a Bedrock SDK error code onto the crate's error taxonomy
///
/// `mid_stream` marks failures raised after the stream opened; unclassified
/// ones become [`LlmError::Streaming`] instead of [`LlmError::Upstream`].
fn classify_error(code: Option<&str>, detail: String, mid_stream: bool) -> LlmError {
    match code {
        Some("ThrottlingException" | "ServiceQuotaExceededException" | "TooManyRequestsException") => {
            LlmError::RateLimited { message: detail }
        }
        Some(
            "InternalServerException"
            | "ModelErrorException"
            | "ModelStreamErrorException"
            | "ServiceUnavailableException"
            | "ModelNotReadyException"
            | "ModelTimeoutException",
        ) => LlmError::ProviderInternal(detail),
        Some("ValidationException" | "ResourceNotFoundException") => LlmError::InvalidRequest(detail),
        Some("AccessDeniedException" | "UnrecognizedClientException" | "ExpiredTokenException") => {
            LlmError::Unauthorized(detail)
        }
        _ if mid_stream => LlmError::Streaming(detail),
        _ => LlmError::Upstream(detail),
    }
}

fn map_stop_reason(reason: &StopReason) -> FinishReason {
    match reason {
        StopReason::MaxTokens => FinishReason::Length,
        StopReason::ToolUse => FinishReason::ToolCalls,
        StopReason::ContentFiltered | StopReason::GuardrailIntervened => FinishReason::ContentFilter,
        // EndTurn, StopSequence and unknown variants
        _ => FinishReason::Stop,
    }
}

#[allow(clippy::cast_sign_loss)]
fn map_usage(usage: &TokenUsage) -> Usage {
    Usage {
        prompt_tokens: usage.input_tokens().max(0) as u32,
        completion_tokens: usage.output_tokens().max(0) as u32,
        total_tokens: usage.total_tokens().max(0) as u32,
    }
}

/// Stop sequence Bedrock reports as matched, if the model surfaces it
fn matched_stop_sequence(fields: Option<&Document>) -> Option<String> {
    let Some(Document::Object(map)) = fields else {
        return None;
    };

    ["stop_sequence", "stopSequence"]
        .iter()
        .find_map(|key| match map.get(*key) {
            Some(Document::String(s)) => Some(s.clone()),
            _ => None,
        })
}

/// Build inference configuration from the request params
fn build_inference_config(request: &CompletionRequest) -> InferenceConfiguration {
    let params = &request.params;

    #[allow(clippy::cast_possible_truncation)]
    let builder = InferenceConfiguration::builder()
        .set_temperature(params.temperature.map(|t| t as f32))
        .set_top_p(params.top_p.map(|p| p as f32))
        .set_max_tokens(params.max_tokens.map(|m| i32::try_from(m).unwrap_or(i32::MAX)));

    let stop: Vec<String> = request
        .stop_sequences()
        .iter()
        .filter(|s| !s.is_empty())
        .cloned()
        .collect();

    builder.set_stop_sequences((!stop.is_empty()).then_some(stop)).build()
}

/// Nova reads `top_k` from `additionalModelRequestFields.inferenceConfig.topK`
fn additional_request_fields(request: &CompletionRequest) -> Option<Document> {
    let top_k = request.params.top_k?;

    let inference = HashMap::from([("topK".to_owned(), Document::Number(Number::PosInt(u64::from(top_k))))]);

    Some(Document::Object(HashMap::from([(
        "inferenceConfig".to_owned(),
        Document::Object(inference),
    )])))
}

/// Build tool configuration, encoding names and mapping the tool choice
///
/// Returns `None` when no tools were offered or the choice is `none`.
fn build_tool_config(request: &CompletionRequest, names: &ToolNameMap) -> Result<Option<ToolConfiguration>, LlmError> {
    let Some(tools) = request.tools.as_deref().filter(|t| !t.is_empty()) else {
        return Ok(None);
    };

    let choice = match &request.tool_choice {
        Some(ToolChoice::None) => return Ok(None),
        None | Some(ToolChoice::Auto) => BedrockToolChoice::Auto(AutoToolChoice::builder().build()),
        Some(ToolChoice::Required) => BedrockToolChoice::Any(AnyToolChoice::builder().build()),
        Some(ToolChoice::Named(name)) => {
            let specific = SpecificToolChoice::builder()
                .name(names.encode(name))
                .build()
                .map_err(|e| LlmError::InvalidRequest(format!("invalid tool choice: {e}")))?;
            BedrockToolChoice::Tool(specific)
        }
    };

    let mut config = ToolConfiguration::builder().tool_choice(choice);

    for tool in tools {
        let spec = ToolSpecification::builder()
            .name(names.encode(&tool.name))
            .set_description(tool.description.clone())
            .input_schema(ToolInputSchema::Json(value_to_document(&tool.parameters)))
            .build()
            .map_err(|e| LlmError::InvalidRequest(format!("invalid tool '{}': {e}", tool.name)))?;

        config = config.tools(Tool::ToolSpec(spec));
    }

    config
        .build()
        .map(Some)
        .map_err(|e| LlmError::InvalidRequest(format!("invalid tool configuration: {e}")))
}

/// Split canonical messages into Bedrock system blocks and conversation turns
fn build_converse_messages(
    messages: &[Message],
    names: &ToolNameMap,
) -> Result<(Vec<SystemContentBlock>, Vec<BedrockMessage>), LlmError> {
    let mut system = Vec::new();
    let mut turns = Vec::new();

    for msg in messages {
        let (role, content) = match msg.role {
            Role::System => {
                system.push(SystemContentBlock::Text(msg.content.as_text().into_owned()));
                continue;
            }
            Role::User => (ConversationRole::User, build_content_blocks(msg, names)?),
            Role::Assistant => (ConversationRole::Assistant, build_content_blocks(msg, names)?),
            // Tool results travel as user turns carrying a tool result block
            Role::Tool => {
                let result = ToolResultBlock::builder()
                    .tool_use_id(msg.tool_call_id.clone().unwrap_or_default())
                    .content(ToolResultContentBlock::Text(msg.content.as_text().into_owned()))
                    .build()
                    .map_err(|e| LlmError::InvalidRequest(format!("invalid tool result: {e}")))?;
                (ConversationRole::User, vec![ContentBlock::ToolResult(result)])
            }
        };

        let turn = BedrockMessage::builder()
            .role(role)
            .set_content(Some(content))
            .build()
            .map_err(|e| LlmError::InvalidRequest(format!("invalid message: {e}")))?;
        turns.push(turn);
    }

    Ok((system, turns))
}

/// Build Bedrock content blocks from a canonical message
fn build_content_blocks(msg: &Message, names: &ToolNameMap) -> Result<Vec<ContentBlock>, LlmError> {
    let mut blocks = Vec::new();

    match &msg.content {
        Content::Text(text) if !text.is_empty() => blocks.push(ContentBlock::Text(text.clone())),
        Content::Text(_) => {}
        Content::Parts(parts) => {
            for part in parts {
                match part {
                    ContentPart::Text { text } => blocks.push(ContentBlock::Text(text.clone())),
                    ContentPart::Image { url } => blocks.push(image_block(url)?),
                }
            }
        }
    }

    for tc in msg.tool_calls.iter().flatten() {
        let input = serde_json::from_str::<serde_json::Value>(&tc.function.arguments)
            .unwrap_or_else(|_| serde_json::json!({}));

        let tool_use = ToolUseBlock::builder()
            .tool_use_id(&tc.id)
            .name(names.encode(&tc.function.name))
            .input(value_to_document(&input))
            .build()
            .map_err(|e| LlmError::InvalidRequest(format!("invalid tool call: {e}")))?;
        blocks.push(ContentBlock::ToolUse(tool_use));
    }

    if blocks.is_empty() {
        blocks.push(ContentBlock::Text(String::new()));
    }

    Ok(blocks)
}

/// Decode a `data:image/<subtype>;base64,<payload>` URI into an inline image block
///
/// Bedrock only accepts inline bytes, so remote URLs are rejected.
fn image_block(url: &str) -> Result<ContentBlock, LlmError> {
    let (mime, payload) = url
        .strip_prefix("data:")
        .and_then(|rest| rest.split_once(";base64,"))
        .ok_or_else(|| LlmError::InvalidRequest("bedrock only accepts base64 data URIs for images".to_owned()))?;

    let format = match mime {
        "image/png" => ImageFormat::Png,
        "image/gif" => ImageFormat::Gif,
        "image/webp" => ImageFormat::Webp,
        "image/jpeg" | "image/jpg" => ImageFormat::Jpeg,
        other => return Err(LlmError::InvalidRequest(format!("unsupported image type: {other}"))),
    };

    let bytes = base64::engine::general_purpose::STANDARD
        .decode(payload)
        .map_err(|e| LlmError::InvalidRequest(format!("invalid base64 image payload: {e}")))?;

    let image = ImageBlock::builder()
        .format(format)
        .source(ImageSource::Bytes(Blob::new(bytes)))
        .build()
        .map_err(|e| LlmError::InvalidRequest(format!("invalid image: {e}")))?;

    Ok(ContentBlock::Image(image))
}

/// Collect text and tool calls from a Bedrock response, decoding tool names
fn extract_bedrock_response(msg: &BedrockMessage, names: &ToolNameMap) -> (String, Vec<ToolCall>) {
    let mut text = String::new();
    let mut tool_calls = Vec::new();

    for block in msg.content() {
        match block {
            ContentBlock::Text(t) => text.push_str(t),
            ContentBlock::ToolUse(tu) => {
                let arguments =
                    serde_json::to_string(&document_to_value(tu.input())).unwrap_or_else(|_| "{}".to_owned());
                tool_calls.push(build_tool_call(tu.tool_use_id().to_owned(), names.decode(tu.name()), arguments));
            }
            _ => {}
        }
    }

    (text, tool_calls)
}

/// Convert a `serde_json::Value` to an AWS `Document`
fn value_to_document(value: &serde_json::Value) -> Document {
    match value {
        serde_json::Value::Null => Document::Null,
        serde_json::Value::Bool(b) => Document::Bool(*b),
        serde_json::Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                Document::Number(Number::PosInt(u))
            } else if let Some(i) = n.as_i64() {
                Document::Number(Number::NegInt(i))
            } else {
                n.as_f64().map_or(Document::Null, |f| Document::Number(Number::Float(f)))
            }
        }
        serde_json::Value::String(s) => Document::String(s.clone()),
        serde_json::Value::Array(items) => Document::Array(items.iter().map(value_to_document).collect()),
        serde_json::Value::Object(map) => {
            Document::Object(map.iter().map(|(k, v)| (k.clone(), value_to_document(v))).collect())
        }
    }
}

/// Convert an AWS `Document` to a `serde_json::Value`
fn document_to_value(doc: &Document) -> serde_json::Value {
    match doc {
        Document::Object(map) => {
            serde_json::Value::Object(map.iter().map(|(k, v)| (k.clone(), document_to_value(v))).collect())
        }
        Document::Array(items) => serde_json::Value::Array(items.iter().map(document_to_value).collect()),
        Document::Number(Number::PosInt(u)) => serde_json::Value::from(*u),
        Document::Number(Number::NegInt(i)) => serde_json::Value::from(*i),
        Document::Number(Number::Float(f)) => {
            serde_json::Number::from_f64(*f).map_or(serde_json::Value::Null, serde_json::Value::Number)
        }
        Document::String(s) => serde_json::Value::String(s.clone()),
        Document::Bool(b) => serde_json::Value::Bool(*b),
        Document::Null => serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use aws_sdk_bedrockruntime::types::{
        ContentBlockDeltaEvent, ContentBlockStartEvent, MessageStopEvent, ToolUseBlockDelta, ToolUseBlockStart,
    };
    use serde_json::json;

    use super::*;
    use crate::error::ErrorKind;
    use crate::types::{CompletionParams, StopSequences, ToolDefinition};

    const ODD_NAME: &str = "-DoSomethingVeryCool-forLitellm_Testin999229291-0293993";

    fn weather_request() -> CompletionRequest {
        let mut request = CompletionRequest::new(
            "amazon.nova-lite-v1:0",
            vec![Message::user("What's the weather like in Boston today in Fahrenheit?")],
        );
        request.tools = Some(vec![ToolDefinition::new(
            ODD_NAME,
            "use this to get the current weather",
            json!({"type": "object", "properties": {}}),
        )]);
        request
    }

    #[test]
    fn error_codes_map_to_kinds() {
        let kind = |code, mid| classify_error(Some(code), "detail".to_owned(), mid).kind();

        assert_eq!(kind("ThrottlingException", false), ErrorKind::RateLimited);
        assert_eq!(kind("ServiceQuotaExceededException", false), ErrorKind::RateLimited);
        assert_eq!(kind("InternalServerException", false), ErrorKind::ProviderInternal);
        assert_eq!(kind("ModelStreamErrorException", true), ErrorKind::ProviderInternal);
        assert_eq!(kind("ValidationException", false), ErrorKind::InvalidRequest);
        assert_eq!(kind("AccessDeniedException", false), ErrorKind::Unauthorized);
        assert_eq!(kind("SomethingNew", false), ErrorKind::Upstream);
        assert_eq!(kind("SomethingNew", true), ErrorKind::Streaming);
        assert_eq!(classify_error(None, "io".to_owned(), false).kind(), ErrorKind::Upstream);
    }

    #[test]
    fn classified_errors_keep_detail() {
        let err = classify_error(
            Some("InternalServerException"),
            "500 Internal error encountered.".to_owned(),
            false,
        );
        assert!(err.to_string().contains("Internal error encountered"));
    }

    #[test]
    fn stop_reasons_map_to_finish_reasons() {
        assert_eq!(map_stop_reason(&StopReason::EndTurn), FinishReason::Stop);
        assert_eq!(map_stop_reason(&StopReason::StopSequence), FinishReason::Stop);
        assert_eq!(map_stop_reason(&StopReason::MaxTokens), FinishReason::Length);
        assert_eq!(map_stop_reason(&StopReason::ToolUse), FinishReason::ToolCalls);
        assert_eq!(map_stop_reason(&StopReason::ContentFiltered), FinishReason::ContentFilter);
    }

    #[test]
    fn top_k_goes_to_additional_fields() {
        let mut request = weather_request();
        assert!(additional_request_fields(&request).is_none());

        request.params.top_k = Some(1);
        let fields = additional_request_fields(&request).unwrap();
        assert_eq!(document_to_value(&fields), json!({"inferenceConfig": {"topK": 1}}));
    }

    #[test]
    fn inference_config_carries_sampling_and_stop() {
        let mut request = weather_request();
        request.params = CompletionParams {
            temperature: Some(0.3),
            top_p: Some(1.0),
            top_k: None,
            max_tokens: Some(100),
            stop: Some(StopSequences::Many(vec!["5".to_owned(), "10".to_owned()])),
        };

        let config = build_inference_config(&request);
        assert_eq!(config.max_tokens(), Some(100));
        assert_eq!(config.stop_sequences(), ["5".to_owned(), "10".to_owned()]);
        assert!((config.temperature().unwrap() - 0.3).abs() < 1e-6);
    }

    #[test]
    fn tool_names_are_encoded_in_tool_config() {
        let request = weather_request();
        let names = ToolNameMap::from_tools(request.tools.as_deref().unwrap());
        let config = build_tool_config(&request, &names).unwrap().unwrap();

        let Tool::ToolSpec(spec) = &config.tools()[0] else {
            panic!("expected tool spec");
        };
        assert_ne!(spec.name(), ODD_NAME);
        assert_eq!(names.decode(spec.name()), ODD_NAME);
        assert!(matches!(config.tool_choice(), Some(BedrockToolChoice::Auto(_))));
    }

    #[test]
    fn tool_choice_modes_map_to_bedrock() {
        let mut request = weather_request();
        let names = ToolNameMap::from_tools(request.tools.as_deref().unwrap());

        request.tool_choice = Some(ToolChoice::None);
        assert!(build_tool_config(&request, &names).unwrap().is_none());

        request.tool_choice = Some(ToolChoice::Required);
        let config = build_tool_config(&request, &names).unwrap().unwrap();
        assert!(matches!(config.tool_choice(), Some(BedrockToolChoice::Any(_))));

        request.tool_choice = Some(ToolChoice::Named(ODD_NAME.to_owned()));
        let config = build_tool_config(&request, &names).unwrap().unwrap();
        let Some(BedrockToolChoice::Tool(specific)) = config.tool_choice() else {
            panic!("expected specific tool choice");
        };
        assert_eq!(specific.name(), names.encode(ODD_NAME));
    }

    #[test]
    fn system_messages_become_system_blocks() {
        let messages = vec![
            Message::system("You are a helpful assistant."),
            Message::user("Write a short poem about the sky"),
        ];
        let (system, turns) = build_converse_messages(&messages, &ToolNameMap::default()).unwrap();

        assert_eq!(system.len(), 1);
        assert_eq!(turns.len(), 1);
        assert_eq!(*turns[0].role(), ConversationRole::User);
    }

    #[test]
    fn tool_turns_round_trip_with_encoded_names() {
        let request = weather_request();
        let names = ToolNameMap::from_tools(request.tools.as_deref().unwrap());
        let call = build_tool_call("tooluse_1".to_owned(), ODD_NAME.to_owned(), r#"{"location":"Boston"}"#.to_owned());
        let messages = vec![
            Message::user("What's the weather like in Boston today in Fahrenheit?"),
            Message::assistant_tool_calls(vec![call]),
            Message::tool_result("tooluse_1", "72F"),
        ];

        let (_, turns) = build_converse_messages(&messages, &names).unwrap();
        assert_eq!(turns.len(), 3);

        let ContentBlock::ToolUse(tool_use) = &turns[1].content()[0] else {
            panic!("expected tool use block");
        };
        assert_eq!(tool_use.name(), names.encode(ODD_NAME));

        assert_eq!(*turns[2].role(), ConversationRole::User);
        let ContentBlock::ToolResult(result) = &turns[2].content()[0] else {
            panic!("expected tool result block");
        };
        assert_eq!(result.tool_use_id(), "tooluse_1");
    }

    #[test]
    fn data_uri_images_are_decoded() {
        let block = image_block("data:image/png;base64,iVBORw0KGgo=").unwrap();
        let ContentBlock::Image(image) = block else {
            panic!("expected image block");
        };
        assert_eq!(*image.format(), ImageFormat::Png);
    }

    #[test]
    fn remote_and_unknown_images_are_rejected() {
        let remote = image_block("https://example.com/cat.png").unwrap_err();
        assert_eq!(remote.kind(), ErrorKind::InvalidRequest);

        let tiff = image_block("data:image/tiff;base64,AAAA").unwrap_err();
        assert!(tiff.to_string().contains("image/tiff"));
    }

    #[test]
    fn response_tool_names_are_decoded() {
        let request = weather_request();
        let names = ToolNameMap::from_tools(request.tools.as_deref().unwrap());

        let tool_use = ToolUseBlock::builder()
            .tool_use_id("tooluse_1")
            .name(names.encode(ODD_NAME))
            .input(value_to_document(&json!({"location": "Boston", "unit": "fahrenheit"})))
            .build()
            .unwrap();
        let msg = BedrockMessage::builder()
            .role(ConversationRole::Assistant)
            .content(ContentBlock::ToolUse(tool_use))
            .build()
            .unwrap();

        let (text, calls) = extract_bedrock_response(&msg, &names);
        assert!(text.is_empty());
        assert_eq!(calls[0].function.name, ODD_NAME);
        let args: serde_json::Value = serde_json::from_str(&calls[0].function.arguments).unwrap();
        assert_eq!(args["location"], "Boston");
    }

    #[test]
    fn matched_stop_sequence_reads_either_spelling() {
        let snake = Document::Object(HashMap::from([(
            "stop_sequence".to_owned(),
            Document::String("</tool>".to_owned()),
        )]));
        let camel = Document::Object(HashMap::from([("stopSequence".to_owned(), Document::String("5".to_owned()))]));

        assert_eq!(matched_stop_sequence(Some(&snake)).as_deref(), Some("</tool>"));
        assert_eq!(matched_stop_sequence(Some(&camel)).as_deref(), Some("5"));
        assert_eq!(matched_stop_sequence(None), None);
    }

    #[test]
    fn stream_translator_restores_stop_and_decodes_names() {
        let names = ToolNameMap::from_tools(weather_request().tools.as_deref().unwrap());
        let mut translator = StreamTranslator::new(names.clone(), vec!["5".to_owned(), "10".to_owned()]);

        let text = ConverseStreamOutput::ContentBlockDelta(
            ContentBlockDeltaEvent::builder()
                .content_block_index(0)
                .delta(ContentBlockDelta::Text("1, 2, 3, 4, ".to_owned()))
                .build()
                .unwrap(),
        );
        assert!(matches!(translator.translate(text), Some(StreamEvent::Delta(_))));

        let start = ConverseStreamOutput::ContentBlockStart(
            ContentBlockStartEvent::builder()
                .content_block_index(1)
                .start(ContentBlockStart::ToolUse(
                    ToolUseBlockStart::builder()
                        .tool_use_id("t1")
                        .name(names.encode(ODD_NAME))
                        .build()
                        .unwrap(),
                ))
                .build()
                .unwrap(),
        );
        let Some(StreamEvent::Delta(delta)) = translator.translate(start) else {
            panic!("expected tool start delta");
        };
        let call = delta.tool_call.unwrap();
        assert_eq!(call.index, 0);
        assert_eq!(call.name.as_deref(), Some(ODD_NAME));
        assert_eq!(call.id.as_deref(), Some("t1"));

        let args = ConverseStreamOutput::ContentBlockDelta(
            ContentBlockDeltaEvent::builder()
                .content_block_index(1)
                .delta(ContentBlockDelta::ToolUse(
                    ToolUseBlockDelta::builder().input("{}").build().unwrap(),
                ))
                .build()
                .unwrap(),
        );
        let Some(StreamEvent::Delta(delta)) = translator.translate(args) else {
            panic!("expected tool args delta");
        };
        assert_eq!(delta.tool_call, Some(StreamToolCall::arguments(0, "{}")));

        let stop = ConverseStreamOutput::MessageStop(
            MessageStopEvent::builder()
                .stop_reason(StopReason::StopSequence)
                .build()
                .unwrap(),
        );
        let Some(StreamEvent::Delta(delta)) = translator.translate(stop) else {
            panic!("expected terminal delta");
        };
        assert_eq!(delta.finish_reason, Some(FinishReason::Stop));
        assert_eq!(delta.content.as_deref(), Some("5"));
    }

    #[test]
    fn document_conversion_preserves_integers() {
        let value = json!({"type": "object", "properties": {}, "n": -3, "x": 1.5, "ok": true});
        assert_eq!(document_to_value(&value_to_document(&value)), value);
    }
}
