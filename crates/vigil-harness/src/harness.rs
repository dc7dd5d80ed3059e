use std::sync::Arc;

use vigil_config::HarnessConfig;
use vigil_llm::types::{CompletionParams, ContentPart, Message, StopSequences, ToolDefinition};
use vigil_llm::{CompletionRequest, CompletionResponse, Provider};

use crate::checks;
use crate::error::HarnessError;
use crate::image::{ImageSubtype, data_uri};
use crate::outcome::{Outcome, Tolerance};
use crate::reassemble::reassemble;

/// Sampling used for the tool-calling case
const TOOL_TEMPERATURE: f64 = 1.0;
const TOOL_TOP_P: f64 = 1.0;
const TOOL_TOP_K: u32 = 1;

/// Sampling used for the stop-sequence case
const STOP_MAX_TOKENS: u32 = 100;
const STOP_TEMPERATURE: f64 = 0.3;

/// Per-run harness options
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HarnessSettings {
    /// Log full responses at `info`
    pub verbose: bool,
    /// Exclusive word ceiling for system-prompt completions
    pub max_words: usize,
}

impl Default for HarnessSettings {
    fn default() -> Self {
        Self {
            verbose: false,
            max_words: 15,
        }
    }
}

impl From<&HarnessConfig> for HarnessSettings {
    fn from(config: &HarnessConfig) -> Self {
        Self {
            verbose: config.verbose,
            max_words: config.max_words,
        }
    }
}

/// Drives a chat-completion client and checks the completion contract
///
/// Each operation returns `Outcome::Verified` when every check passed,
/// `Outcome::Tolerated` when the client failed in a way the operation
/// accepts, and an error otherwise.
#[derive(Clone)]
pub struct Harness {
    client: Arc<dyn Provider>,
    settings: HarnessSettings,
}

impl Harness {
    pub fn new(client: Arc<dyn Provider>, settings: HarnessSettings) -> Self {
        Self { client, settings }
    }

    pub const fn settings(&self) -> &HarnessSettings {
        &self.settings
    }

    /// Plain text completion
    ///
    /// Checks: at least one choice, choice 0 content non-empty.
    #[tracing::instrument(skip_all, fields(model = %model, op = "text"))]
    pub async fn run_text_completion(
        &self,
        model: &str,
        messages: Vec<Message>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<Outcome, HarnessError> {
        let request = text_request(model, messages, max_tokens, temperature)?;

        let result = async {
            let response = self.send(&request).await?;
            checks::first_content_non_empty(&response)?;
            Ok::<_, HarnessError>(response)
        };

        Tolerance::RATE_LIMITED.settle(result.await)
    }

    /// Completion with a system message prepended
    ///
    /// Checks those of [`Harness::run_text_completion`] plus the word ceiling.
    #[tracing::instrument(skip_all, fields(model = %model, op = "system"))]
    pub async fn run_completion_with_system_prompt(
        &self,
        model: &str,
        system_text: &str,
        messages: Vec<Message>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<Outcome, HarnessError> {
        let request = text_request(model, with_system(system_text, messages), max_tokens, temperature)?;
        Tolerance::RATE_LIMITED.settle(self.brief_completion(&request).await)
    }

    /// Streamed variant of [`Harness::run_completion_with_system_prompt`]
    ///
    /// The stream is drained and reassembled before any check runs.
    #[tracing::instrument(skip_all, fields(model = %model, op = "system_stream"))]
    pub async fn run_streaming_completion_with_system_prompt(
        &self,
        model: &str,
        system_text: &str,
        messages: Vec<Message>,
        max_tokens: u32,
        temperature: f64,
    ) -> Result<Outcome, HarnessError> {
        let mut request = text_request(model, with_system(system_text, messages), max_tokens, temperature)?;
        request.stream = true;
        Tolerance::RATE_LIMITED.settle(self.brief_completion(&request).await)
    }

    /// Text prompt plus one inline image
    ///
    /// Only the presence of a choice is checked. Provider-internal faults are
    /// tolerated alongside rate limits.
    #[tracing::instrument(skip_all, fields(model = %model, op = "image", subtype = %image_subtype))]
    pub async fn run_multimodal_completion(
        &self,
        model: &str,
        text_prompt: &str,
        image_bytes: &[u8],
        image_subtype: ImageSubtype,
    ) -> Result<Outcome, HarnessError> {
        if image_bytes.is_empty() {
            return Err(HarnessError::InvalidInput("image is empty".to_owned()));
        }

        let message = Message::user_parts(vec![
            ContentPart::text(text_prompt),
            ContentPart::image_url(data_uri(image_bytes, image_subtype)),
        ]);
        let request = CompletionRequest::new(model, vec![message]);

        let result = async {
            let response = self.send(&request).await?;
            checks::has_choices(&response)?;
            Ok::<_, HarnessError>(response)
        };

        Tolerance::TRANSIENT_PROVIDER_FAULT.settle(result.await)
    }

    /// Single user turn offered `tool_specs`
    ///
    /// Tool calls are optional; any call attributable to a requested tool must
    /// carry its exact name.
    #[tracing::instrument(skip_all, fields(model = %model, op = "tools"))]
    pub async fn run_tool_calling_completion(
        &self,
        model: &str,
        user_text: &str,
        tool_specs: Vec<ToolDefinition>,
    ) -> Result<Outcome, HarnessError> {
        if tool_specs.is_empty() {
            return Err(HarnessError::InvalidInput("no tools supplied".to_owned()));
        }

        let mut request = CompletionRequest::new(model, vec![Message::user(user_text)]);
        request.params = CompletionParams {
            temperature: Some(TOOL_TEMPERATURE),
            top_p: Some(TOOL_TOP_P),
            top_k: Some(TOOL_TOP_K),
            ..CompletionParams::default()
        };
        request.tools = Some(tool_specs);

        let result = async {
            let response = self.send(&request).await?;
            checks::has_choices(&response)?;
            checks::tool_names_faithful(&response, request.tools.as_deref().unwrap_or_default())?;
            Ok::<_, HarnessError>(response)
        };

        Tolerance::RATE_LIMITED.settle(result.await)
    }

    /// Non-streaming completion with stop sequences
    ///
    /// When the model stopped naturally, the content must end with the first
    /// stop sequence.
    #[tracing::instrument(skip_all, fields(model = %model, op = "stop", stop = ?stop_spec))]
    pub async fn run_stop_sequence_completion(
        &self,
        model: &str,
        prompt: &str,
        stop_spec: StopSequences,
    ) -> Result<Outcome, HarnessError> {
        if stop_spec.first().is_none_or(str::is_empty) {
            return Err(HarnessError::InvalidInput("stop sequence is empty".to_owned()));
        }

        let mut request = text_request(model, vec![Message::user(prompt)], STOP_MAX_TOKENS, STOP_TEMPERATURE)?;
        request.params.stop = Some(stop_spec.clone());

        let result = async {
            let response = self.send(&request).await?;
            checks::first_content_non_empty(&response)?;
            checks::ends_with_stop(&response, &stop_spec)?;
            Ok::<_, HarnessError>(response)
        };

        Tolerance::RATE_LIMITED.settle(result.await)
    }

    async fn brief_completion(&self, request: &CompletionRequest) -> Result<CompletionResponse, HarnessError> {
        let response = self.send(request).await?;
        checks::first_content_non_empty(&response)?;
        checks::word_count_below(&response, self.settings.max_words)?;
        Ok(response)
    }

    async fn send(&self, request: &CompletionRequest) -> Result<CompletionResponse, HarnessError> {
        let response = if request.stream {
            let stream = self.client.complete_stream(request).await?;
            reassemble(stream, &request.model).await?
        } else {
            self.client.complete(request).await?
        };

        let first = response.first_choice();
        if self.settings.verbose {
            tracing::info!(
                response = %serde_json::to_string(&response).unwrap_or_default(),
                "completion response"
            );
        } else {
            tracing::debug!(
                choices = response.choices.len(),
                finish_reason = ?first.and_then(|c| c.finish_reason),
                content_len = first.map_or(0, |c| c.text().len()),
                "completion response"
            );
        }

        Ok(response)
    }
}

fn with_system(system_text: &str, messages: Vec<Message>) -> Vec<Message> {
    let mut all = Vec::with_capacity(messages.len() + 1);
    all.push(Message::system(system_text));
    all.extend(messages);
    all
}

fn text_request(
    model: &str,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f64,
) -> Result<CompletionRequest, HarnessError> {
    if messages.is_empty() {
        return Err(HarnessError::InvalidInput("messages must not be empty".to_owned()));
    }
    if max_tokens == 0 {
        return Err(HarnessError::InvalidInput("max_tokens must be positive".to_owned()));
    }

    let mut request = CompletionRequest::new(model, messages);
    request.params.max_tokens = Some(max_tokens);
    request.params.temperature = Some(temperature);
    Ok(request)
}
