use async_trait::async_trait;

use crate::conversation::Message;
use crate::stats::UsageReport;
use crate::tools::capability::Capabilities;
use crate::tools::services::ModelCallError;
use crate::tools::static_tool::{StaticTool, StaticToolContext, StaticToolError};
use atypica_tools::error::ToolExecutionError;
use atypica_tools::result::ReasoningResult;
use atypica_tools::tools::reasoning::{
    REASONING_THINKING_TOOL_NAME, ReasoningError, ReasoningParams, ReasoningThinkingToolSpec,
};

const DESCRIPTION: &str = r#"Consult a reasoning expert before deciding how to continue the interview.
- Provide the background: the research topic and what the interviewee has said so far
- Provide one focused question, e.g. which need to explore next or how to read an answer
- Returns the expert's analysis as plain text"#;

const EXPERT_SYSTEM: &str = "You are a senior consumer research strategist. Think the question \
through carefully using only the background you are given, then answer concisely with \
concrete, actionable guidance.";

pub struct ReasoningThinkingTool;

#[async_trait]
impl StaticTool for ReasoningThinkingTool {
    type Params = ReasoningParams;
    type Output = ReasoningResult;
    type Spec = ReasoningThinkingToolSpec;

    const DESCRIPTION: &'static str = DESCRIPTION;
    const REQUIRED_CAPABILITIES: Capabilities = Capabilities::MODEL_CALLER;

    async fn execute(
        &self,
        params: Self::Params,
        ctx: &StaticToolContext,
    ) -> Result<Self::Output, StaticToolError> {
        let (model_caller, model) = ctx
            .services
            .model_caller()
            .ok_or_else(|| StaticToolError::missing_capability("model_caller"))?;

        let prompt = format!(
            "Background:\n{}\n\nQuestion:\n{}",
            params.background, params.question
        );

        let response = model_caller
            .call(
                model,
                vec![Message::user(prompt)],
                Some(EXPERT_SYSTEM.to_string()),
                ctx.cancel_token().clone(),
            )
            .await
            .map_err(|e| match e {
                ModelCallError::Api(message) => StaticToolError::execution(
                    ToolExecutionError::ReasoningThinking(ReasoningError::ModelCallFailed {
                        message,
                    }),
                ),
                ModelCallError::Cancelled => StaticToolError::Cancelled,
            })?;

        if response.usage.total_tokens > 0 {
            ctx.services
                .stats
                .report(UsageReport::tokens(
                    &ctx.run.scope,
                    ctx.role,
                    response.usage,
                    REASONING_THINKING_TOOL_NAME,
                ))
                .await;
        }

        let answer = response.extract_text().trim().to_string();
        if answer.is_empty() {
            return Err(StaticToolError::execution(
                ToolExecutionError::ReasoningThinking(ReasoningError::EmptyResponse),
            ));
        }

        Ok(ReasoningResult {
            question: params.question,
            answer,
        })
    }
}
