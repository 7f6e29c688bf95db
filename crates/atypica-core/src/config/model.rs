use serde::{Deserialize, Serialize};
use std::fmt;

/// Model identifier as the generation service knows it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModelId(pub String);

impl ModelId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModelId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

pub const DEFAULT_INTERVIEWER_MODEL: &str = "gpt-4o";
pub const DEFAULT_PERSONA_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_REASONING_MODEL: &str = "o3-mini";
pub const DEFAULT_SCOUT_MODEL: &str = "gpt-4o";

/// Which model drives each agent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentModels {
    pub interviewer: ModelId,
    pub persona: ModelId,
    /// Used by the interviewer's `reasoning_thinking` tool.
    pub reasoning: ModelId,
    pub scout: ModelId,
}

impl Default for AgentModels {
    fn default() -> Self {
        Self {
            interviewer: ModelId::from(DEFAULT_INTERVIEWER_MODEL),
            persona: ModelId::from(DEFAULT_PERSONA_MODEL),
            reasoning: ModelId::from(DEFAULT_REASONING_MODEL),
            scout: ModelId::from(DEFAULT_SCOUT_MODEL),
        }
    }
}
