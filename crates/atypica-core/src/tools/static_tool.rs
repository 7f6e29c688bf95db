use std::sync::Arc;

use async_trait::async_trait;
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;

use atypica_tools::error::ToolExecutionError;
use atypica_tools::result::ToolResult;
use atypica_tools::{ToolError, ToolSchema, ToolSpec};

use super::capability::Capabilities;
use super::services::ToolServices;
use crate::agent::{AgentRole, RunContext};

/// What a tool sees of the turn that called it. Cancellation follows the
/// run's token.
#[derive(Debug, Clone)]
pub struct StaticToolContext {
    pub tool_call_id: String,
    pub role: AgentRole,
    pub run: RunContext,
    pub services: Arc<ToolServices>,
}

impl StaticToolContext {
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.run.cancel_token
    }

    pub fn is_cancelled(&self) -> bool {
        self.run.is_cancelled()
    }
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum StaticToolError {
    #[error("Invalid parameters: {0}")]
    InvalidParams(String),

    #[error("{0}")]
    Execution(ToolExecutionError),

    #[error("Missing capability: {0}")]
    MissingCapability(String),

    #[error("Cancelled")]
    Cancelled,
}

impl StaticToolError {
    pub fn invalid_params(msg: impl Into<String>) -> Self {
        Self::InvalidParams(msg.into())
    }

    pub fn execution(error: ToolExecutionError) -> Self {
        Self::Execution(error)
    }

    pub fn missing_capability(cap: &str) -> Self {
        Self::MissingCapability(cap.to_string())
    }

    /// Attach the tool name and lift into the error the model gets to see.
    pub fn into_tool_error(self, tool_name: &str) -> ToolError {
        match self {
            StaticToolError::InvalidParams(message) => ToolError::invalid_params(tool_name, message),
            StaticToolError::Execution(e) => ToolError::Execution(e),
            StaticToolError::MissingCapability(cap) => {
                ToolError::InternalError(format!("{tool_name} requires {cap}"))
            }
            StaticToolError::Cancelled => ToolError::Cancelled(tool_name.to_string()),
        }
    }
}

#[async_trait]
pub trait StaticTool: Send + Sync + 'static {
    type Params: DeserializeOwned + JsonSchema + Send;
    type Output: Into<ToolResult> + Send;
    type Spec: ToolSpec<Params = Self::Params, Result = Self::Output>;

    const DESCRIPTION: &'static str;
    const REQUIRED_CAPABILITIES: Capabilities;

    async fn execute(
        &self,
        params: Self::Params,
        ctx: &StaticToolContext,
    ) -> Result<Self::Output, StaticToolError>;

    /// Draft-07 schema with subschemas inlined; chat-completions endpoints
    /// reject `$ref`.
    fn schema() -> ToolSchema
    where
        Self: Sized,
    {
        let params = schemars::generate::SchemaSettings::draft07()
            .with(|settings| settings.inline_subschemas = true)
            .into_generator()
            .into_root_schema_for::<Self::Params>();

        ToolSchema {
            name: <Self::Spec as ToolSpec>::NAME.to_string(),
            display_name: <Self::Spec as ToolSpec>::DISPLAY_NAME.to_string(),
            description: Self::DESCRIPTION.to_string(),
            input_schema: params.into(),
        }
    }
}

#[async_trait]
pub trait StaticToolErased: Send + Sync {
    fn name(&self) -> &'static str;
    fn required_capabilities(&self) -> Capabilities;
    fn schema(&self) -> ToolSchema;

    async fn execute_erased(
        &self,
        params: serde_json::Value,
        ctx: &StaticToolContext,
    ) -> Result<ToolResult, StaticToolError>;
}

#[async_trait]
impl<T> StaticToolErased for T
where
    T: StaticTool,
{
    fn name(&self) -> &'static str {
        <T::Spec as ToolSpec>::NAME
    }

    fn required_capabilities(&self) -> Capabilities {
        T::REQUIRED_CAPABILITIES
    }

    fn schema(&self) -> ToolSchema {
        T::schema()
    }

    async fn execute_erased(
        &self,
        params: serde_json::Value,
        ctx: &StaticToolContext,
    ) -> Result<ToolResult, StaticToolError> {
        if ctx.is_cancelled() {
            return Err(StaticToolError::Cancelled);
        }
        let params = serde_json::from_value::<T::Params>(params)
            .map_err(|e| StaticToolError::invalid_params(e.to_string()))?;

        self.execute(params, ctx).await.map(Into::into)
    }
}
