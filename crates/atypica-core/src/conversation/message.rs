//! Message types for interview transcripts.
//!
//! A `Message` is one finished turn. Its `content` is the text the speaker
//! produced; `parts` keeps the ordered record of how the turn was built
//! (text segments, reasoning, tool calls with their results).

use atypica_tools::ToolCall;
pub use atypica_tools::result::ToolResult;
use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};
use strum_macros::Display;

/// Role in the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Copy, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn inverted(self) -> Self {
        match self {
            Role::User => Role::Assistant,
            Role::Assistant => Role::User,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MessagePart {
    Text {
        text: String,
    },
    Reasoning {
        text: String,
    },
    ToolInvocation {
        tool_call: ToolCall,
        result: ToolInvocationResult,
    },
}

/// Stored form of a tool result: what the model saw, plus whether it failed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolInvocationResult {
    pub output: String,
    #[serde(default)]
    pub is_error: bool,
}

impl From<&ToolResult> for ToolInvocationResult {
    fn from(result: &ToolResult) -> Self {
        Self {
            output: result.llm_format(),
            is_error: result.is_error(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Message {
    pub id: String,
    pub role: Role,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parts: Vec<MessagePart>,
    pub timestamp: u64,
}

impl Message {
    pub fn user(text: impl Into<String>) -> Self {
        Self::text(Role::User, text)
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self::text(Role::Assistant, text)
    }

    pub fn text(role: Role, text: impl Into<String>) -> Self {
        let timestamp = Self::current_timestamp();
        Self {
            id: Self::generate_id(&role.to_string()),
            role,
            content: text.into(),
            parts: Vec::new(),
            timestamp,
        }
    }

    /// Assemble a finished assistant turn from its parts. The content is the
    /// concatenation of the text parts in order.
    pub fn from_parts(role: Role, parts: Vec<MessagePart>) -> Self {
        let content = parts
            .iter()
            .filter_map(|part| match part {
                MessagePart::Text { text } if !text.is_empty() => Some(text.as_str()),
                _ => None,
            })
            .collect::<String>();
        let timestamp = Self::current_timestamp();
        Self {
            id: Self::generate_id(&role.to_string()),
            role,
            content,
            parts,
            timestamp,
        }
    }

    /// The same turn seen from the other side of the conversation.
    pub fn with_role(&self, role: Role) -> Self {
        Self {
            role,
            ..self.clone()
        }
    }

    pub fn inverted(&self) -> Self {
        self.with_role(self.role.inverted())
    }

    pub fn tool_invocations(&self) -> impl Iterator<Item = (&ToolCall, &ToolInvocationResult)> {
        self.parts.iter().filter_map(|part| match part {
            MessagePart::ToolInvocation { tool_call, result } => Some((tool_call, result)),
            _ => None,
        })
    }

    pub fn current_timestamp() -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    pub fn generate_id(prefix: &str) -> String {
        format!("{}_{}", prefix, uuid::Uuid::now_v7())
    }
}
