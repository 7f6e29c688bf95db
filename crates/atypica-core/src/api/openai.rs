use async_trait::async_trait;
use futures::StreamExt;
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::api::error::{ApiError, StreamError};
use crate::api::provider::{
    AssistantContent, CompletionResponse, CompletionStream, Provider, StreamChunk, TokenUsage,
};
use crate::api::sse::{SseEvent, parse_sse_stream};
use crate::config::model::ModelId;
use crate::conversation::{Message, MessagePart, Role};
use atypica_tools::{ToolCall, ToolSchema};

pub const PROVIDER_NAME: &str = "openai";
const DEFAULT_API_URL: &str = "https://api.openai.com/v1/chat/completions";
const HTTP_TIMEOUT_SECS: u64 = 300;

/// Streaming client for OpenAI-compatible chat completion endpoints.
#[derive(Clone)]
pub struct OpenAiProvider {
    http_client: reqwest::Client,
    base_url: String,
}

impl OpenAiProvider {
    pub fn new(api_key: &str, base_url: Option<&str>) -> Result<Self, ApiError> {
        let mut headers = header::HeaderMap::new();
        let auth = header::HeaderValue::from_str(&format!("Bearer {api_key}"))
            .map_err(|e| ApiError::Configuration(format!("Invalid API key format: {e}")))?;
        headers.insert(header::AUTHORIZATION, auth);

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ApiError::Configuration(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: normalize_chat_url(base_url),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn convert_stream(
        mut sse_stream: impl futures::Stream<Item = Result<SseEvent, crate::api::error::SseParseError>>
        + Unpin
        + Send
        + 'static,
        token: CancellationToken,
    ) -> impl futures::Stream<Item = StreamChunk> + Send + 'static {
        #[derive(Default)]
        struct ToolCallAccumulator {
            id: String,
            name: String,
            args: String,
            started: bool,
        }

        async_stream::stream! {
            let mut text = String::new();
            let mut reasoning = String::new();
            let mut tool_calls: BTreeMap<usize, ToolCallAccumulator> = BTreeMap::new();
            let mut usage = TokenUsage::default();

            loop {
                let event = tokio::select! {
                    biased;
                    () = token.cancelled() => {
                        yield StreamChunk::Error(StreamError::Cancelled);
                        break;
                    }
                    event = sse_stream.next() => event,
                };

                let Some(event) = event else {
                    yield StreamChunk::Error(StreamError::Incomplete {
                        provider: PROVIDER_NAME.to_string(),
                    });
                    break;
                };

                let event = match event {
                    Ok(event) => event,
                    Err(e) => {
                        yield StreamChunk::Error(StreamError::SseParse(e));
                        break;
                    }
                };

                if event.data == "[DONE]" {
                    let mut content = Vec::new();
                    if !reasoning.is_empty() {
                        content.push(AssistantContent::Reasoning { text: std::mem::take(&mut reasoning) });
                    }
                    if !text.is_empty() {
                        content.push(AssistantContent::Text { text: std::mem::take(&mut text) });
                    }
                    for call in std::mem::take(&mut tool_calls).into_values() {
                        if call.id.is_empty() || call.name.is_empty() {
                            debug!(
                                target: "openai::stream",
                                "Skipping tool call with missing id/name: id='{}' name='{}'",
                                call.id,
                                call.name
                            );
                            continue;
                        }
                        let parameters = serde_json::from_str(&call.args)
                            .unwrap_or(serde_json::Value::Object(serde_json::Map::new()));
                        content.push(AssistantContent::ToolCall {
                            tool_call: ToolCall { name: call.name, parameters, id: call.id },
                        });
                    }
                    yield StreamChunk::MessageComplete(CompletionResponse { content, usage });
                    break;
                }

                let chunk: OpenAiStreamChunk = match serde_json::from_str(&event.data) {
                    Ok(chunk) => chunk,
                    Err(e) => {
                        debug!(target: "openai::stream", "Failed to parse chunk: {} data: {}", e, event.data);
                        continue;
                    }
                };

                if let Some(error) = chunk.error {
                    yield StreamChunk::Error(StreamError::Provider {
                        provider: PROVIDER_NAME.to_string(),
                        message: error.message,
                    });
                    break;
                }

                if let Some(reported) = chunk.usage {
                    usage = TokenUsage {
                        prompt_tokens: reported.prompt_tokens,
                        completion_tokens: reported.completion_tokens,
                        total_tokens: reported.total_tokens,
                    };
                    yield StreamChunk::Usage(usage);
                }

                let Some(choice) = chunk.choices.into_iter().next() else {
                    continue;
                };

                if let Some(delta) = choice.delta.reasoning_content {
                    reasoning.push_str(&delta);
                    yield StreamChunk::ReasoningDelta(delta);
                }

                if let Some(delta) = choice.delta.content {
                    text.push_str(&delta);
                    yield StreamChunk::TextDelta(delta);
                }

                for tc in choice.delta.tool_calls.unwrap_or_default() {
                    let entry = tool_calls.entry(tc.index).or_default();
                    if let Some(id) = tc.id.filter(|id| !id.is_empty()) {
                        entry.id = id;
                    }
                    let (name, args) = tc
                        .function
                        .map(|f| (f.name, f.arguments))
                        .unwrap_or_default();
                    if let Some(name) = name.filter(|name| !name.is_empty()) {
                        entry.name = name;
                    }
                    if !entry.started && !entry.id.is_empty() && !entry.name.is_empty() {
                        entry.started = true;
                        yield StreamChunk::ToolCallStart {
                            id: entry.id.clone(),
                            name: entry.name.clone(),
                        };
                    }
                    if let Some(args) = args.filter(|args| !args.is_empty()) {
                        entry.args.push_str(&args);
                        if entry.started {
                            yield StreamChunk::ToolCallInputDelta {
                                id: entry.id.clone(),
                                delta: args,
                            };
                        }
                    }
                }
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn stream_complete(
        &self,
        model: &ModelId,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Option<Vec<ToolSchema>>,
        token: CancellationToken,
    ) -> Result<CompletionStream, ApiError> {
        let request = OpenAiRequest {
            model: model.as_str().to_string(),
            messages: convert_messages(system, &messages),
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
            tools: tools.map(|tools| tools.into_iter().map(OpenAiTool::from).collect()),
        };

        let send = self.http_client.post(&self.base_url).json(&request).send();
        let response = tokio::select! {
            biased;
            () = token.cancelled() => {
                return Err(ApiError::Cancelled { provider: PROVIDER_NAME.to_string() });
            }
            response = send => response.map_err(ApiError::Network)?,
        };

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            debug!(target: "openai::stream", "API error status={} body={}", status, body);
            return Err(ApiError::from_status(PROVIDER_NAME, status.as_u16(), body));
        }

        let sse_stream = parse_sse_stream(response.bytes_stream());
        Ok(Box::pin(Self::convert_stream(sse_stream, token)))
    }
}

fn normalize_chat_url(base_url: Option<&str>) -> String {
    match base_url.map(|url| url.trim().trim_end_matches('/')) {
        None | Some("") => DEFAULT_API_URL.to_string(),
        Some(url) if url.ends_with("/chat/completions") => url.to_string(),
        Some(url) => format!("{url}/chat/completions"),
    }
}

fn convert_messages(system: Option<String>, messages: &[Message]) -> Vec<OpenAiMessage> {
    let mut converted = Vec::with_capacity(messages.len() + 1);
    if let Some(content) = system.filter(|s| !s.is_empty()) {
        converted.push(OpenAiMessage::System { content });
    }
    for message in messages {
        match message.role {
            // The other side's tool use is not ours to replay.
            Role::User => converted.push(OpenAiMessage::User {
                content: message.content.clone(),
            }),
            Role::Assistant => convert_assistant(message, &mut converted),
        }
    }
    converted
}

/// An assistant turn is replayed as it happened: text, then any tool calls
/// with their results, then the text that followed them.
fn convert_assistant(message: &Message, out: &mut Vec<OpenAiMessage>) {
    if message.parts.is_empty() {
        out.push(OpenAiMessage::Assistant {
            content: Some(message.content.clone()),
            tool_calls: None,
        });
        return;
    }

    let mut text = String::new();
    let mut calls: Vec<OpenAiToolCall> = Vec::new();
    let mut results: Vec<OpenAiMessage> = Vec::new();

    let flush = |text: &mut String,
                 calls: &mut Vec<OpenAiToolCall>,
                 results: &mut Vec<OpenAiMessage>,
                 out: &mut Vec<OpenAiMessage>| {
        if text.is_empty() && calls.is_empty() {
            return;
        }
        out.push(OpenAiMessage::Assistant {
            content: (!text.is_empty()).then(|| std::mem::take(text)),
            tool_calls: (!calls.is_empty()).then(|| std::mem::take(calls)),
        });
        out.append(results);
    };

    for part in &message.parts {
        match part {
            MessagePart::Text { text: segment } => {
                if !calls.is_empty() {
                    flush(&mut text, &mut calls, &mut results, out);
                }
                if !text.is_empty() {
                    text.push('\n');
                }
                text.push_str(segment);
            }
            MessagePart::ToolInvocation { tool_call, result } => {
                calls.push(OpenAiToolCall {
                    id: tool_call.id.clone(),
                    tool_type: "function".to_string(),
                    function: OpenAiFunctionCall {
                        name: tool_call.name.clone(),
                        arguments: tool_call.parameters.to_string(),
                    },
                });
                results.push(OpenAiMessage::Tool {
                    content: result.output.clone(),
                    tool_call_id: tool_call.id.clone(),
                });
            }
            MessagePart::Reasoning { .. } => {}
        }
    }
    flush(&mut text, &mut calls, &mut results, out);
}

#[derive(Debug, Serialize, PartialEq)]
#[serde(tag = "role", rename_all = "lowercase")]
enum OpenAiMessage {
    System {
        content: String,
    },
    User {
        content: String,
    },
    Assistant {
        #[serde(skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        tool_calls: Option<Vec<OpenAiToolCall>>,
    },
    Tool {
        content: String,
        tool_call_id: String,
    },
}

#[derive(Debug, Serialize, PartialEq)]
struct OpenAiToolCall {
    id: String,
    #[serde(rename = "type")]
    tool_type: String,
    function: OpenAiFunctionCall,
}

#[derive(Debug, Serialize, PartialEq)]
struct OpenAiFunctionCall {
    name: String,
    arguments: String, // JSON string
}

#[derive(Debug, Serialize)]
struct OpenAiTool {
    #[serde(rename = "type")]
    tool_type: &'static str,
    function: OpenAiFunction,
}

#[derive(Debug, Serialize)]
struct OpenAiFunction {
    name: String,
    description: String,
    parameters: serde_json::Value,
}

impl From<ToolSchema> for OpenAiTool {
    fn from(tool: ToolSchema) -> Self {
        Self {
            tool_type: "function",
            function: OpenAiFunction {
                parameters: tool.input_schema.to_json(),
                name: tool.name,
                description: tool.description,
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct StreamOptions {
    include_usage: bool,
}

#[derive(Debug, Serialize)]
struct OpenAiRequest {
    model: String,
    messages: Vec<OpenAiMessage>,
    stream: bool,
    stream_options: StreamOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<OpenAiTool>>,
}

#[derive(Debug, Deserialize)]
struct OpenAiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChunk {
    #[serde(default)]
    choices: Vec<OpenAiStreamChoice>,
    #[serde(default)]
    usage: Option<OpenAiUsage>,
    #[serde(default)]
    error: Option<OpenAiStreamErrorBody>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamErrorBody {
    message: String,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamChoice {
    delta: OpenAiStreamDelta,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Option<Vec<OpenAiStreamToolCall>>,
    #[serde(default)]
    reasoning_content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamToolCall {
    index: usize,
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    function: Option<OpenAiStreamFunction>,
}

#[derive(Debug, Deserialize)]
struct OpenAiStreamFunction {
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    arguments: Option<String>,
}
