use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ToolSpec;
use crate::error::ToolExecutionError;
use crate::result::SaveConclusionResult;

pub const SAVE_INTERVIEW_CONCLUSION_TOOL_NAME: &str = "save_interview_conclusion";

pub struct SaveInterviewConclusionToolSpec;

impl ToolSpec for SaveInterviewConclusionToolSpec {
    type Params = SaveConclusionParams;
    type Result = SaveConclusionResult;
    type Error = SaveConclusionError;

    const NAME: &'static str = SAVE_INTERVIEW_CONCLUSION_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "Save Interview Conclusion";

    fn execution_error(error: Self::Error) -> ToolExecutionError {
        ToolExecutionError::SaveConclusion(error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum SaveConclusionError {
    #[error("failed to store the conclusion: {message}")]
    StoreFailed { message: String },

    #[error("the conclusion is empty")]
    EmptyConclusion,

    #[error("conclusions can only be saved during an interview")]
    NoSession,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SaveConclusionParams {
    /// Assessment of the product proposal and suggested improvements
    pub conclusion: String,
    /// Demographics, consumption habits, lifestyle, values and preferences of the interviewee
    pub persona_summary: String,
    /// Dialogue excerpts that best reveal the interviewee's needs, with key findings
    pub highlights: String,
}
