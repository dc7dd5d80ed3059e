//! Mock chat-completion backend for integration tests
//!
//! Implements the OpenAI-compatible `/v1/chat/completions` endpoint with
//! canned replies, word-per-chunk SSE streaming, tool-call echo and
//! stop-sequence emulation. Failures can be injected per request.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::{Json, Router, routing};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio_util::sync::CancellationToken;

/// Reply used when none is configured
pub const DEFAULT_REPLY: &str = "Hello from mock LLM";

/// How the mock answers
#[derive(Debug, Clone)]
pub struct MockOptions {
    /// Assistant text for plain completions
    pub reply: String,
    /// Fail this many requests before answering (`u32::MAX` fails forever)
    pub fail_count: u32,
    /// Status of injected failures
    pub fail_status: StatusCode,
    /// Message of injected failures
    pub fail_message: String,
    /// Echo tool names with `-` replaced by `_`
    pub mangle_tool_names: bool,
    /// Cut the reply before the stop sequence instead of after it
    pub omit_stop_sequence: bool,
    /// End streams without a finish reason or `[DONE]`
    pub truncate_streams: bool,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            reply: DEFAULT_REPLY.to_owned(),
            fail_count: 0,
            fail_status: StatusCode::INTERNAL_SERVER_ERROR,
            fail_message: "mock server intentional failure".to_owned(),
            mangle_tool_names: false,
            omit_stop_sequence: false,
            truncate_streams: false,
        }
    }
}

/// Mock backend that returns predictable responses
pub struct MockLlm {
    addr: SocketAddr,
    shutdown: CancellationToken,
    state: Arc<MockLlmState>,
}

struct MockLlmState {
    options: MockOptions,
    completion_count: AtomicU32,
    remaining_failures: AtomicU32,
    requests: Mutex<Vec<Value>>,
}

impl MockLlm {
    /// Start a mock answering with [`DEFAULT_REPLY`]
    pub async fn start() -> anyhow::Result<Self> {
        Self::start_with(MockOptions::default()).await
    }

    /// Start a mock answering with `reply`
    pub async fn start_with_response(reply: &str) -> anyhow::Result<Self> {
        Self::start_with(MockOptions {
            reply: reply.to_owned(),
            ..MockOptions::default()
        })
        .await
    }

    /// Start a mock that fails the first `n` requests with `status`
    pub async fn start_failing(n: u32, status: StatusCode, message: &str) -> anyhow::Result<Self> {
        Self::start_with(MockOptions {
            fail_count: n,
            fail_status: status,
            fail_message: message.to_owned(),
            ..MockOptions::default()
        })
        .await
    }

    pub async fn start_with(options: MockOptions) -> anyhow::Result<Self> {
        let state = Arc::new(MockLlmState {
            remaining_failures: AtomicU32::new(options.fail_count),
            options,
            completion_count: AtomicU32::new(0),
            requests: Mutex::new(Vec::new()),
        });

        let app = Router::new()
            .route("/v1/chat/completions", routing::post(handle_chat_completions))
            .with_state(Arc::clone(&state));

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let shutdown = CancellationToken::new();
        let shutdown_clone = shutdown.clone();

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    shutdown_clone.cancelled().await;
                })
                .await
                .ok();
        });

        Ok(Self { addr, shutdown, state })
    }

    /// Base URL for configuring the mock as a provider
    ///
    /// Includes `/v1` since the provider appends `/chat/completions`
    pub fn base_url(&self) -> String {
        format!("http://{}/v1", self.addr)
    }

    /// Number of completion requests received
    pub fn completion_count(&self) -> u32 {
        self.state.completion_count.load(Ordering::Relaxed)
    }

    /// Request bodies received, oldest first
    pub fn requests(&self) -> Vec<Value> {
        self.state.requests.lock().unwrap().clone()
    }

    /// Most recent request body
    pub fn last_request(&self) -> Value {
        self.requests().pop().expect("mock received no requests")
    }
}

impl Drop for MockLlm {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}

// -- Request shape the mock inspects --

#[derive(Debug, Deserialize)]
struct ChatCompletionRequest {
    model: String,
    #[serde(default)]
    stream: Option<bool>,
    #[serde(default)]
    stop: Option<StopField>,
    #[serde(default)]
    tools: Option<Vec<ToolSpec>>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum StopField {
    One(String),
    Many(Vec<String>),
}

impl StopField {
    fn candidates(&self) -> Vec<&str> {
        match self {
            Self::One(s) => vec![s.as_str()],
            Self::Many(list) => list.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ToolSpec {
    function: ToolFunction,
}

#[derive(Debug, Deserialize)]
struct ToolFunction {
    name: String,
}

fn usage() -> Value {
    json!({"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15})
}

const CREATED: u64 = 1_700_000_000;

/// What the mock decided to answer
struct Answer {
    content: Option<String>,
    tool_call: Option<(String, String)>,
    finish_reason: &'static str,
}

fn answer(options: &MockOptions, req: &ChatCompletionRequest) -> Answer {
    // Always calls the last requested tool
    if let Some(tool) = req.tools.as_ref().and_then(|tools| tools.last()) {
        let name = if options.mangle_tool_names {
            tool.function.name.replace('-', "_")
        } else {
            tool.function.name.clone()
        };
        return Answer {
            content: None,
            tool_call: Some((name, r#"{"location":"Boston"}"#.to_owned())),
            finish_reason: "tool_calls",
        };
    }

    let reply = options.reply.as_str();
    let earliest_stop = req.stop.as_ref().and_then(|stop| {
        stop.candidates()
            .into_iter()
            .filter(|c| !c.is_empty())
            .filter_map(|c| reply.find(c).map(|at| (at, c)))
            .min_by_key(|(at, _)| *at)
    });

    let content = match earliest_stop {
        Some((at, _)) if options.omit_stop_sequence => &reply[..at],
        Some((at, stop)) => &reply[..at + stop.len()],
        None => reply,
    };

    Answer {
        content: Some(content.to_owned()),
        tool_call: None,
        finish_reason: "stop",
    }
}

// -- Handlers --

async fn handle_chat_completions(
    State(state): State<Arc<MockLlmState>>,
    Json(body): Json<Value>,
) -> Response {
    state.completion_count.fetch_add(1, Ordering::Relaxed);
    state.requests.lock().unwrap().push(body.clone());

    let remaining = state.remaining_failures.load(Ordering::Relaxed);
    if remaining > 0 {
        if remaining != u32::MAX {
            state.remaining_failures.fetch_sub(1, Ordering::Relaxed);
        }
        return (
            state.options.fail_status,
            Json(json!({
                "error": {
                    "message": state.options.fail_message,
                    "type": "server_error"
                }
            })),
        )
            .into_response();
    }

    let req: ChatCompletionRequest = match serde_json::from_value(body) {
        Ok(req) => req,
        Err(e) => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({"error": {"message": e.to_string(), "type": "invalid_request_error"}})),
            )
                .into_response();
        }
    };

    let answer = answer(&state.options, &req);

    if req.stream.unwrap_or(false) {
        return build_streaming_response(&state.options, &req.model, answer).into_response();
    }

    let tool_calls = answer.tool_call.map(|(name, arguments)| {
        json!([{
            "id": "call_test_123",
            "type": "function",
            "function": {"name": name, "arguments": arguments}
        }])
    });

    Json(json!({
        "id": "chatcmpl-test-123",
        "object": "chat.completion",
        "created": CREATED,
        "model": req.model,
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": answer.content, "tool_calls": tool_calls},
            "finish_reason": answer.finish_reason
        }],
        "usage": usage()
    }))
    .into_response()
}

/// Append one `data:` frame
fn sse(body: &mut String, frame: &Value) {
    body.push_str("data: ");
    body.push_str(&frame.to_string());
    body.push_str("\n\n");
}

/// Build an SSE streaming response body
fn build_streaming_response(options: &MockOptions, model: &str, answer: Answer) -> impl IntoResponse {
    let frame = |delta: Value, finish_reason: Option<&str>| {
        json!({
            "id": "chatcmpl-test-stream",
            "object": "chat.completion.chunk",
            "created": CREATED,
            "model": model,
            "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
        })
    };

    let mut body = String::new();
    sse(&mut body, &frame(json!({"role": "assistant", "content": ""}), None));

    if let Some((name, arguments)) = answer.tool_call {
        let opening = json!({"tool_calls": [{
            "index": 0,
            "id": "call_test_stream",
            "type": "function",
            "function": {"name": name}
        }]});
        sse(&mut body, &frame(opening, None));

        let args = json!({"tool_calls": [{"index": 0, "function": {"arguments": arguments}}]});
        sse(&mut body, &frame(args, None));
    }

    // One frame per word, whitespace kept
    for word in answer.content.as_deref().unwrap_or_default().split_inclusive(' ') {
        sse(&mut body, &frame(json!({"content": word}), None));
    }

    if !options.truncate_streams {
        sse(&mut body, &frame(json!({}), Some(answer.finish_reason)));

        let mut trailer = frame(json!({}), None);
        trailer["choices"] = json!([]);
        trailer["usage"] = usage();
        sse(&mut body, &trailer);

        body.push_str("data: [DONE]\n\n");
    }

    (
        StatusCode::OK,
        [(axum::http::header::CONTENT_TYPE, "text/event-stream")],
        body,
    )
}
