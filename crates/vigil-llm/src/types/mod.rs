//! Canonical request/response types shared by every provider
//!
//! These types are provider-agnostic; wire formats convert to and from them.

pub mod message;
pub mod request;
pub mod response;
pub mod stream;
pub mod tool;

pub use message::{Content, ContentPart, FunctionCall, Message, Role, ToolCall};
pub use request::{CompletionParams, CompletionRequest, StopSequences};
pub use response::{Choice, ChoiceMessage, CompletionResponse, FinishReason, Usage, build_tool_call, unix_now};
pub use stream::{StreamDelta, StreamEvent, StreamToolCall};
pub use tool::{ToolChoice, ToolDefinition};
