use async_trait::async_trait;
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use std::ops::AddAssign;
use std::pin::Pin;
use tokio_util::sync::CancellationToken;

use crate::api::error::{ApiError, StreamError};
use crate::config::model::ModelId;
use crate::conversation::Message;
use atypica_tools::{ToolCall, ToolSchema};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

impl AddAssign for TokenUsage {
    fn add_assign(&mut self, other: Self) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AssistantContent {
    Text { text: String },
    Reasoning { text: String },
    ToolCall { tool_call: ToolCall },
}

/// One generation step, fully assembled.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct CompletionResponse {
    pub content: Vec<AssistantContent>,
    #[serde(default)]
    pub usage: TokenUsage,
}

impl CompletionResponse {
    /// Extract all text content from the response
    pub fn extract_text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                AssistantContent::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("")
    }

    pub fn has_tool_calls(&self) -> bool {
        self.content
            .iter()
            .any(|block| matches!(block, AssistantContent::ToolCall { .. }))
    }

    pub fn extract_tool_calls(&self) -> Vec<ToolCall> {
        self.content
            .iter()
            .filter_map(|block| match block {
                AssistantContent::ToolCall { tool_call } => Some(tool_call.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Events of one streamed generation step. `MessageComplete` and `Error`
/// are terminal; nothing follows them.
#[derive(Debug, Clone)]
pub enum StreamChunk {
    TextDelta(String),
    ReasoningDelta(String),
    ToolCallStart { id: String, name: String },
    ToolCallInputDelta { id: String, delta: String },
    Usage(TokenUsage),
    MessageComplete(CompletionResponse),
    Error(StreamError),
}

pub type CompletionStream = Pin<Box<dyn Stream<Item = StreamChunk> + Send>>;

/// Provider trait that all generation backends implement
#[async_trait]
pub trait Provider: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    /// Start one streamed generation step.
    async fn stream_complete(
        &self,
        model: &ModelId,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Option<Vec<ToolSchema>>,
        token: CancellationToken,
    ) -> Result<CompletionStream, ApiError>;
}

/// Drain a completion stream down to its terminal event.
pub async fn collect_response(
    mut stream: CompletionStream,
) -> Result<CompletionResponse, StreamError> {
    while let Some(chunk) = stream.next().await {
        match chunk {
            StreamChunk::MessageComplete(response) => return Ok(response),
            StreamChunk::Error(err) => return Err(err),
            StreamChunk::Usage(usage) => {
                tracing::trace!(
                    target: "api::stream",
                    total_tokens = usage.total_tokens,
                    "usage reported"
                );
            }
            StreamChunk::ToolCallStart { id, name } => {
                tracing::trace!(target: "api::stream", %id, %name, "tool call started");
            }
            StreamChunk::TextDelta(_)
            | StreamChunk::ReasoningDelta(_)
            | StreamChunk::ToolCallInputDelta { .. } => {}
        }
    }
    Err(StreamError::Incomplete {
        provider: "unknown".to_string(),
    })
}
