use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::tools::{
    CONTENT_SEARCH_TOOL_NAME, REASONING_THINKING_TOOL_NAME, SAVE_INTERVIEW_CONCLUSION_TOOL_NAME,
    SAVE_PERSONA_TOOL_NAME, USER_NOTES_TOOL_NAME, content_search::ContentSearchError,
    reasoning::ReasoningError, save_conclusion::SaveConclusionError,
    save_persona::SavePersonaError,
};

#[derive(Error, Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub enum ToolError {
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    #[error("Invalid parameters for {tool_name}: {message}")]
    InvalidParams { tool_name: String, message: String },

    #[error("{0}")]
    Execution(ToolExecutionError),

    #[error("{0} was cancelled")]
    Cancelled(String),

    #[error("Unexpected error: {0}")]
    InternalError(String),
}

impl ToolError {
    pub fn execution<T: Into<String>, M: Into<String>>(tool_name: T, message: M) -> Self {
        ToolError::Execution(ToolExecutionError::External {
            tool_name: tool_name.into(),
            message: message.into(),
        })
    }

    pub fn invalid_params<T: Into<String>, M: Into<String>>(tool_name: T, message: M) -> Self {
        ToolError::InvalidParams {
            tool_name: tool_name.into(),
            message: message.into(),
        }
    }

    /// Name of the tool the error belongs to, when one is known.
    pub fn tool_name(&self) -> Option<&str> {
        match self {
            ToolError::UnknownTool(name) | ToolError::Cancelled(name) => Some(name),
            ToolError::InvalidParams { tool_name, .. } => Some(tool_name),
            ToolError::Execution(inner) => Some(inner.tool_name()),
            ToolError::InternalError(_) => None,
        }
    }
}

#[derive(Error, Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(tag = "tool", content = "error", rename_all = "snake_case")]
pub enum ToolExecutionError {
    #[error("{0}")]
    ReasoningThinking(ReasoningError),
    #[error("{0}")]
    SaveConclusion(SaveConclusionError),
    #[error("{0}")]
    ContentSearch(ContentSearchError),
    #[error("{0}")]
    UserNotes(ContentSearchError),
    #[error("{0}")]
    SavePersona(SavePersonaError),

    #[error("{tool_name} failed: {message}")]
    External { tool_name: String, message: String },
}

impl ToolExecutionError {
    pub fn tool_name(&self) -> &str {
        match self {
            ToolExecutionError::ReasoningThinking(_) => REASONING_THINKING_TOOL_NAME,
            ToolExecutionError::SaveConclusion(_) => SAVE_INTERVIEW_CONCLUSION_TOOL_NAME,
            ToolExecutionError::ContentSearch(_) => CONTENT_SEARCH_TOOL_NAME,
            ToolExecutionError::UserNotes(_) => USER_NOTES_TOOL_NAME,
            ToolExecutionError::SavePersona(_) => SAVE_PERSONA_TOOL_NAME,
            ToolExecutionError::External { tool_name, .. } => tool_name.as_str(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn execution_errors_report_their_tool() {
        let err = ToolError::Execution(ToolExecutionError::ContentSearch(
            ContentSearchError::Http { status: 502 },
        ));
        assert_eq!(err.tool_name(), Some(CONTENT_SEARCH_TOOL_NAME));
        assert!(err.to_string().contains("502"));
    }

    #[test]
    fn scouting_errors_report_their_tool() {
        let err = ToolError::Execution(ToolExecutionError::UserNotes(ContentSearchError::Http {
            status: 404,
        }));
        assert_eq!(err.tool_name(), Some(USER_NOTES_TOOL_NAME));

        let err = ToolError::Execution(ToolExecutionError::SavePersona(
            SavePersonaError::NotScouting,
        ));
        assert_eq!(err.tool_name(), Some(SAVE_PERSONA_TOOL_NAME));
    }

    #[test]
    fn internal_errors_have_no_tool() {
        let err = ToolError::InternalError("boom".to_string());
        assert_eq!(err.tool_name(), None);
    }

    #[test]
    fn external_errors_keep_the_given_name() {
        let err = ToolError::execution("custom_tool", "went sideways");
        assert_eq!(err.tool_name(), Some("custom_tool"));
        assert_eq!(err.to_string(), "custom_tool failed: went sideways");
    }
}
