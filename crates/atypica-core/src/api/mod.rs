pub mod error;
pub mod openai;
pub mod provider;
pub mod sse;

pub use error::{ApiError, SseParseError, StreamError};
pub use openai::OpenAiProvider;
pub use provider::{
    AssistantContent, CompletionResponse, CompletionStream, Provider, StreamChunk, TokenUsage,
    collect_response,
};
