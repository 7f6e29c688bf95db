use std::collections::HashMap;

use tracing::debug;

use atypica_tools::{ToolCall, ToolError, ToolResult, ToolSchema};

use super::capability::Capabilities;
use super::static_tool::{StaticToolContext, StaticToolErased};
use super::static_tools::{
    ContentSearchTool, ReasoningThinkingTool, SaveInterviewConclusionTool, SavePersonaTool,
    UserNotesTool,
};
use crate::agent::AgentRole;

/// Name-indexed tools available to one agent turn.
pub struct ToolSet {
    tools: HashMap<String, Box<dyn StaticToolErased>>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// The fixed toolset of each agent.
    pub fn for_role(role: AgentRole) -> Self {
        let mut set = Self::new();
        match role {
            AgentRole::Persona => {
                set.register(ContentSearchTool);
            }
            AgentRole::Interviewer => {
                set.register(ReasoningThinkingTool);
                set.register(SaveInterviewConclusionTool);
            }
            AgentRole::Scout => {
                set.register(ReasoningThinkingTool);
                set.register(ContentSearchTool);
                set.register(UserNotesTool);
                set.register(SavePersonaTool);
            }
        }
        set
    }

    pub fn register<T: StaticToolErased + 'static>(&mut self, tool: T) {
        self.tools.insert(tool.name().to_string(), Box::new(tool));
    }

    /// Schemas of the tools the runtime can actually serve, sorted by name.
    pub fn schemas(&self, available: Capabilities) -> Vec<ToolSchema> {
        let mut schemas: Vec<ToolSchema> = self
            .tools
            .values()
            .filter(|tool| available.satisfies(tool.required_capabilities()))
            .map(|tool| tool.schema())
            .collect();
        schemas.sort_by(|a, b| a.name.cmp(&b.name));
        schemas
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tools.contains_key(name)
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    pub async fn execute(
        &self,
        call: &ToolCall,
        ctx: &StaticToolContext,
    ) -> Result<ToolResult, ToolError> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| ToolError::UnknownTool(call.name.clone()))?;

        let available = ctx.services.capabilities();
        let required = tool.required_capabilities();
        if !available.satisfies(required) {
            return Err(ToolError::InternalError(format!(
                "{} requires {}",
                call.name,
                available.missing(required)
            )));
        }

        debug!(
            target: "tools::toolset",
            tool = %call.name,
            id = %call.id,
            role = %ctx.role,
            "executing tool"
        );

        tool.execute_erased(call.parameters.clone(), ctx)
            .await
            .map_err(|e| e.into_tool_error(&call.name))
    }
}

impl Default for ToolSet {
    fn default() -> Self {
        Self::new()
    }
}
