use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ToolSpec;
use crate::error::ToolExecutionError;
use crate::result::SavePersonaResult;

pub const SAVE_PERSONA_TOOL_NAME: &str = "save_persona";

pub struct SavePersonaToolSpec;

impl ToolSpec for SavePersonaToolSpec {
    type Params = SavePersonaParams;
    type Result = SavePersonaResult;
    type Error = SavePersonaError;

    const NAME: &'static str = SAVE_PERSONA_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "Save Persona";

    fn execution_error(error: Self::Error) -> ToolExecutionError {
        ToolExecutionError::SavePersona(error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum SavePersonaError {
    #[error("failed to store the persona: {message}")]
    StoreFailed { message: String },

    #[error("{field} must not be empty")]
    Empty { field: String },

    #[error("personas can only be saved from a scouting run")]
    NotScouting,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct SavePersonaParams {
    /// Short display name for the persona
    pub name: String,
    /// Keywords describing the persona, such as age group, occupation or interests
    pub tags: Vec<String>,
    /// Role-play prompt starting with "你是" (or "You are"), covering background, habits, way of speaking and values
    pub prompt: String,
}
