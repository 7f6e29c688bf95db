pub mod message;
pub mod transcript;

pub use message::{Message, MessagePart, Role, ToolInvocationResult, ToolResult};
pub use transcript::{Speaker, Transcripts};
