use std::sync::Arc;

use futures::future::try_join_all;
use thiserror::Error;
use tracing::{debug, info, instrument};

use atypica_tools::{ToolCall, ToolError, ToolResult};

use super::context::{AgentRole, RunContext};
use crate::api::{
    ApiError, AssistantContent, Provider, StreamError, TokenUsage, collect_response,
};
use crate::config::model::ModelId;
use crate::conversation::{Message, MessagePart, Role, ToolInvocationResult};
use crate::stats::{self, StatReporter, UsageReport};
use crate::tools::{StaticToolContext, ToolServices, ToolSet};

#[derive(Debug, Error)]
pub enum InvokeError {
    #[error(transparent)]
    Api(ApiError),
    #[error(transparent)]
    Stream(StreamError),
    #[error(transparent)]
    Tool(#[from] ToolError),
    #[error("Invocation cancelled")]
    Cancelled,
}

impl From<ApiError> for InvokeError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Cancelled { .. } => InvokeError::Cancelled,
            other => InvokeError::Api(other),
        }
    }
}

impl From<StreamError> for InvokeError {
    fn from(err: StreamError) -> Self {
        match err {
            StreamError::Cancelled => InvokeError::Cancelled,
            other => InvokeError::Stream(other),
        }
    }
}

/// One agent turn to produce.
pub struct AgentTurn<'a> {
    pub role: AgentRole,
    pub model: &'a ModelId,
    pub system_prompt: &'a str,
    /// The speaking agent's own view of the conversation.
    pub transcript: &'a [Message],
    pub toolset: &'a ToolSet,
}

#[derive(Debug, Clone)]
pub struct Invocation {
    pub message: Message,
    pub usage: TokenUsage,
    pub steps: usize,
}

/// Runs a complete agent turn: generation steps interleaved with tool
/// execution, collapsed into one finished assistant message.
#[derive(Clone)]
pub struct AgentInvoker {
    provider: Arc<dyn Provider>,
    services: Arc<ToolServices>,
    stats: Arc<dyn StatReporter>,
    max_steps: usize,
}

impl AgentInvoker {
    pub fn new(
        provider: Arc<dyn Provider>,
        services: Arc<ToolServices>,
        stats: Arc<dyn StatReporter>,
        max_steps: usize,
    ) -> Self {
        Self {
            provider,
            services,
            stats,
            max_steps: max_steps.max(1),
        }
    }

    /// The same invoker with a different per-turn step budget.
    pub fn with_max_steps(&self, max_steps: usize) -> Self {
        Self {
            max_steps: max_steps.max(1),
            ..self.clone()
        }
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    #[instrument(skip_all, name = "AgentInvoker::invoke", fields(scope = %ctx.scope, role = %turn.role))]
    pub async fn invoke(
        &self,
        turn: AgentTurn<'_>,
        ctx: &RunContext,
    ) -> Result<Invocation, InvokeError> {
        let token = &ctx.cancel_token;
        let schemas = turn.toolset.schemas(self.services.capabilities());
        let tools = (!schemas.is_empty()).then_some(schemas);

        let mut parts: Vec<MessagePart> = Vec::new();
        let mut usage = TokenUsage::default();
        let mut steps = 0;

        while steps < self.max_steps {
            if token.is_cancelled() {
                return Err(InvokeError::Cancelled);
            }

            let mut messages = turn.transcript.to_vec();
            if !parts.is_empty() {
                messages.push(Message::from_parts(Role::Assistant, parts.clone()));
            }

            debug!(target: "AgentInvoker::invoke", model = %turn.model, step = steps + 1, "Calling model");
            let stream = tokio::select! {
                biased;
                () = token.cancelled() => return Err(InvokeError::Cancelled),
                stream = self.provider.stream_complete(
                    turn.model,
                    messages,
                    Some(turn.system_prompt.to_string()),
                    tools.clone(),
                    token.clone(),
                ) => stream?,
            };
            let response = collect_response(stream).await?;
            steps += 1;

            usage += response.usage;
            if response.usage.total_tokens > 0 {
                self.stats
                    .report(UsageReport::tokens(
                        &ctx.scope,
                        turn.role,
                        response.usage,
                        stats::reporter_for(&ctx.scope),
                    ))
                    .await;
            }

            let mut tool_calls = Vec::new();
            for content in response.content {
                match content {
                    AssistantContent::Text { text } if !text.trim().is_empty() => {
                        parts.push(MessagePart::Text { text });
                    }
                    AssistantContent::Reasoning { text } if !text.is_empty() => {
                        parts.push(MessagePart::Reasoning { text });
                    }
                    AssistantContent::ToolCall { tool_call } => tool_calls.push(tool_call),
                    AssistantContent::Text { .. } | AssistantContent::Reasoning { .. } => {}
                }
            }

            if tool_calls.is_empty() {
                break;
            }

            info!(count = tool_calls.len(), "Model requested tool calls");
            let results = tokio::select! {
                biased;
                () = token.cancelled() => return Err(InvokeError::Cancelled),
                results = self.run_tools(&tool_calls, turn.role, turn.toolset, ctx) => results?,
            };

            for (tool_call, result) in tool_calls.into_iter().zip(results) {
                parts.push(MessagePart::ToolInvocation {
                    result: ToolInvocationResult::from(&result),
                    tool_call,
                });
            }
        }

        Ok(Invocation {
            message: Message::from_parts(Role::Assistant, parts),
            usage,
            steps,
        })
    }

    /// Run every call of one step concurrently. The first failure fails the turn.
    async fn run_tools(
        &self,
        calls: &[ToolCall],
        role: AgentRole,
        toolset: &ToolSet,
        ctx: &RunContext,
    ) -> Result<Vec<ToolResult>, ToolError> {
        try_join_all(calls.iter().map(|call| {
            let tool_ctx = StaticToolContext {
                tool_call_id: call.id.clone(),
                role,
                run: ctx.clone(),
                services: self.services.clone(),
            };
            async move { toolset.execute(call, &tool_ctx).await }
        }))
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{InterviewStore, LeaseToken, MemoryStore, NewPersona, NewTopic};
    use crate::test_utils::{RecordingStatReporter, ScriptedProvider, ScriptedReply};
    use atypica_tools::tools::SAVE_INTERVIEW_CONCLUSION_TOOL_NAME;
    use tokio_util::sync::CancellationToken;

    struct Fixture {
        store: Arc<MemoryStore>,
        stats: Arc<RecordingStatReporter>,
        ctx: RunContext,
    }

    async fn fixture() -> Fixture {
        let store = Arc::new(MemoryStore::new());
        let topic = store
            .create_topic(NewTopic {
                role: "researcher".to_string(),
                topic: "oat milk".to_string(),
            })
            .await
            .unwrap();
        let persona = store.create_persona(NewPersona::default()).await.unwrap();
        let session = store.upsert_session(topic.id, persona.id).await.unwrap();
        Fixture {
            store,
            stats: Arc::new(RecordingStatReporter::default()),
            ctx: RunContext::interview(
                session.id,
                topic.id,
                persona.id,
                LeaseToken::generate(),
                CancellationToken::new(),
            ),
        }
    }

    fn invoker(f: &Fixture, provider: Arc<ScriptedProvider>, max_steps: usize) -> AgentInvoker {
        let services = Arc::new(ToolServices::new(f.store.clone(), f.stats.clone()));
        AgentInvoker::new(provider, services, f.stats.clone(), max_steps)
    }

    #[tokio::test]
    async fn plain_reply_is_one_step() {
        let f = fixture().await;
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedReply::text(
            "I drink oat milk daily.",
        )]));
        let toolset = ToolSet::for_role(AgentRole::Persona);
        let model = ModelId::from("gpt-4o-mini");

        let invocation = invoker(&f, provider.clone(), 3)
            .invoke(
                AgentTurn {
                    role: AgentRole::Persona,
                    model: &model,
                    system_prompt: "persona",
                    transcript: &[Message::user("hi")],
                    toolset: &toolset,
                },
                &f.ctx,
            )
            .await
            .unwrap();

        assert_eq!(invocation.steps, 1);
        assert_eq!(invocation.message.content, "I drink oat milk daily.");
        assert_eq!(invocation.message.role, Role::Assistant);
        assert_eq!(f.stats.reports().len(), 1);
        assert_eq!(provider.requests()[0].system.as_deref(), Some("persona"));
    }

    #[tokio::test]
    async fn tool_results_feed_the_next_step() {
        let f = fixture().await;
        let provider = Arc::new(ScriptedProvider::new(vec![
            ScriptedReply::tool_call(
                SAVE_INTERVIEW_CONCLUSION_TOOL_NAME,
                serde_json::json!({
                    "conclusion": "Likes it",
                    "persona_summary": "student",
                    "highlights": "\"tasty\""
                }),
            ),
            ScriptedReply::text("Saved."),
        ]));
        let toolset = ToolSet::for_role(AgentRole::Interviewer);
        let model = ModelId::from("gpt-4o");

        let invocation = invoker(&f, provider.clone(), 3)
            .invoke(
                AgentTurn {
                    role: AgentRole::Interviewer,
                    model: &model,
                    system_prompt: "interviewer",
                    transcript: &[Message::user("I am Lin")],
                    toolset: &toolset,
                },
                &f.ctx,
            )
            .await
            .unwrap();

        assert_eq!(invocation.steps, 2);
        assert_eq!(invocation.message.content, "Saved.");
        assert_eq!(invocation.message.tool_invocations().count(), 1);

        let second = &provider.requests()[1];
        assert_eq!(second.messages.len(), 2);
        assert_eq!(second.messages[1].tool_invocations().count(), 1);

        let session = f
            .store
            .get_session(f.ctx.session_id().unwrap())
            .await
            .unwrap();
        assert_eq!(session.conclusion, "Likes it");
    }

    #[tokio::test]
    async fn step_budget_bounds_tool_loops() {
        let f = fixture().await;
        let call = || {
            ScriptedReply::tool_call(
                SAVE_INTERVIEW_CONCLUSION_TOOL_NAME,
                serde_json::json!({"conclusion": "c", "persona_summary": "p", "highlights": "h"}),
            )
        };
        let provider = Arc::new(ScriptedProvider::new(vec![call(), call(), call(), call()]));
        let toolset = ToolSet::for_role(AgentRole::Interviewer);
        let model = ModelId::from("gpt-4o");

        let invocation = invoker(&f, provider.clone(), 2)
            .invoke(
                AgentTurn {
                    role: AgentRole::Interviewer,
                    model: &model,
                    system_prompt: "interviewer",
                    transcript: &[Message::user("hi")],
                    toolset: &toolset,
                },
                &f.ctx,
            )
            .await
            .unwrap();

        assert_eq!(invocation.steps, 2);
        assert_eq!(provider.requests().len(), 2);
    }

    #[test]
    fn step_budget_can_be_swapped_per_agent() {
        let store = Arc::new(MemoryStore::new());
        let stats = Arc::new(RecordingStatReporter::default());
        let services = Arc::new(ToolServices::new(store, stats.clone()));
        let provider = Arc::new(ScriptedProvider::new(vec![]));
        let invoker = AgentInvoker::new(provider, services, stats, 3);

        assert_eq!(invoker.with_max_steps(30).max_steps(), 30);
        assert_eq!(invoker.with_max_steps(0).max_steps(), 1);
        assert_eq!(invoker.max_steps(), 3);
    }

    #[tokio::test]
    async fn tool_failure_fails_the_turn() {
        let f = fixture().await;
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedReply::tool_call(
            "no_such_tool",
            serde_json::json!({}),
        )]));
        let toolset = ToolSet::for_role(AgentRole::Interviewer);
        let model = ModelId::from("gpt-4o");

        let err = invoker(&f, provider, 3)
            .invoke(
                AgentTurn {
                    role: AgentRole::Interviewer,
                    model: &model,
                    system_prompt: "interviewer",
                    transcript: &[Message::user("hi")],
                    toolset: &toolset,
                },
                &f.ctx,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::Tool(ToolError::UnknownTool(_))));
    }

    #[tokio::test]
    async fn cancelled_context_never_calls_the_model() {
        let f = fixture().await;
        f.ctx.cancel_token.cancel();
        let provider = Arc::new(ScriptedProvider::new(vec![ScriptedReply::text("unused")]));
        let toolset = ToolSet::for_role(AgentRole::Persona);
        let model = ModelId::from("gpt-4o-mini");

        let err = invoker(&f, provider.clone(), 3)
            .invoke(
                AgentTurn {
                    role: AgentRole::Persona,
                    model: &model,
                    system_prompt: "persona",
                    transcript: &[Message::user("hi")],
                    toolset: &toolset,
                },
                &f.ctx,
            )
            .await
            .unwrap_err();

        assert!(matches!(err, InvokeError::Cancelled));
        assert!(provider.requests().is_empty());
    }
}
