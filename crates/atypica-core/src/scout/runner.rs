use std::sync::Arc;

use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::prompts;
use crate::agent::{AgentInvoker, AgentRole, AgentTurn, InvokeError, RunContext};
use crate::config::model::ModelId;
use crate::conversation::{Message, Role};
use crate::interview::Language;
use crate::stats::{StatReporter, UsageReport};
use crate::store::{InterviewStore, Persona, ScoutRunId, StoreError};
use crate::tools::ToolSet;

#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Scouting request must not be empty")]
    EmptyRequest,

    #[error("Scout turn failed: {0}")]
    Invocation(#[source] InvokeError),

    #[error("Scouting cancelled")]
    Cancelled,

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<InvokeError> for ScoutError {
    fn from(err: InvokeError) -> Self {
        match err {
            InvokeError::Cancelled => ScoutError::Cancelled,
            other => ScoutError::Invocation(other),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ScoutReport {
    pub scout_run_id: ScoutRunId,
    /// The scout's closing reply.
    pub reply: String,
    /// Every persona the run has saved so far, newest first.
    pub personas: Vec<Persona>,
    pub steps: usize,
}

/// Runs the scout agent over a stored scouting conversation.
pub struct ScoutRunner {
    store: Arc<dyn InterviewStore>,
    invoker: AgentInvoker,
    stats: Arc<dyn StatReporter>,
    model: ModelId,
    language: Language,
    toolset: ToolSet,
}

impl ScoutRunner {
    /// `max_steps` replaces the invoker's per-turn budget for scout turns.
    pub fn new(
        store: Arc<dyn InterviewStore>,
        invoker: &AgentInvoker,
        stats: Arc<dyn StatReporter>,
        model: ModelId,
        language: Language,
        max_steps: usize,
    ) -> Self {
        Self {
            store,
            invoker: invoker.with_max_steps(max_steps),
            stats,
            model,
            language,
            toolset: ToolSet::for_role(AgentRole::Scout),
        }
    }

    /// Open a new scouting run for `description` and work it once.
    pub async fn start(
        &self,
        description: &str,
        cancel: CancellationToken,
    ) -> Result<ScoutReport, ScoutError> {
        let description = description.trim();
        if description.is_empty() {
            return Err(ScoutError::EmptyRequest);
        }
        let run = self.store.create_scout_run(description).await?;
        info!(scout_run_id = %run.id, "Scouting run created");
        self.scout(run.id, vec![Message::user(description)], cancel)
            .await
    }

    /// Continue an existing run with a further request.
    pub async fn follow_up(
        &self,
        scout_run_id: ScoutRunId,
        request: &str,
        cancel: CancellationToken,
    ) -> Result<ScoutReport, ScoutError> {
        let request = request.trim();
        if request.is_empty() {
            return Err(ScoutError::EmptyRequest);
        }
        let mut messages = self.store.get_scout_run(scout_run_id).await?.messages;
        // A request left unanswered by a failed pass is replaced, not stacked.
        if messages.last().is_some_and(|m| m.role == Role::User) {
            messages.pop();
        }
        messages.push(Message::user(request));
        self.scout(scout_run_id, messages, cancel).await
    }

    #[instrument(skip_all, name = "ScoutRunner::scout", fields(%scout_run_id))]
    async fn scout(
        &self,
        scout_run_id: ScoutRunId,
        mut messages: Vec<Message>,
        cancel: CancellationToken,
    ) -> Result<ScoutReport, ScoutError> {
        self.store
            .save_scout_messages(scout_run_id, &messages)
            .await?;

        let ctx = RunContext::scout(scout_run_id, cancel.child_token());
        let system_prompt = prompts::scout_system(self.language);
        let invocation = self
            .invoker
            .invoke(
                AgentTurn {
                    role: AgentRole::Scout,
                    model: &self.model,
                    system_prompt: &system_prompt,
                    transcript: &messages,
                    toolset: &self.toolset,
                },
                &ctx,
            )
            .await
            .inspect_err(|e| warn!("Scout turn failed: {}", e))?;

        let reply = invocation.message.content.clone();
        messages.push(invocation.message);
        self.store
            .save_scout_messages(scout_run_id, &messages)
            .await?;
        self.stats
            .report(UsageReport::scout_steps(scout_run_id, invocation.steps))
            .await;

        let personas = self.store.list_personas_for_scout_run(scout_run_id).await?;
        info!(
            steps = invocation.steps,
            personas = personas.len(),
            "Scouting pass finished"
        );

        Ok(ScoutReport {
            scout_run_id,
            reply,
            personas,
            steps: invocation.steps,
        })
    }
}
