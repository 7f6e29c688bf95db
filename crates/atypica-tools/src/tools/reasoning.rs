use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ToolSpec;
use crate::error::ToolExecutionError;
use crate::result::ReasoningResult;

pub const REASONING_THINKING_TOOL_NAME: &str = "reasoning_thinking";

pub struct ReasoningThinkingToolSpec;

impl ToolSpec for ReasoningThinkingToolSpec {
    type Params = ReasoningParams;
    type Result = ReasoningResult;
    type Error = ReasoningError;

    const NAME: &'static str = REASONING_THINKING_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "Consult Expert";

    fn execution_error(error: Self::Error) -> ToolExecutionError {
        ToolExecutionError::ReasoningThinking(error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ReasoningError {
    #[error("model call failed: {message}")]
    ModelCallFailed { message: String },

    #[error("the reasoning model returned no text")]
    EmptyResponse,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ReasoningParams {
    /// What is known so far: the research topic and what the interviewee has said
    pub background: String,
    /// The question to think through
    pub question: String,
}
