//! Drives one interview session from its current transcript to a terminal
//! outcome.
//!
//! Turns strictly alternate. After every half-turn the persona-side
//! transcript is written back under the run's lease. A watchdog bounds the
//! whole run in wall-clock time; the lease is released however the run ends.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use super::prompts::{self, Language};
use super::termination::TerminationDetector;
use super::watchdog::Watchdog;
use crate::agent::{AgentInvoker, AgentRole, AgentTurn, InvokeError, RunContext};
use crate::config::{AgentModels, DialogueLimits};
use crate::conversation::{Speaker, Transcripts};
use crate::stats::{StatReporter, UsageReport};
use crate::store::{
    InterviewStore, LeaseToken, Persona, Session, SessionId, StoreError, Topic, WriteOutcome,
};
use crate::tools::ToolSet;

#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("{role} turn failed: {source}")]
    Invocation {
        role: AgentRole,
        #[source]
        source: InvokeError,
    },

    #[error("Interview cancelled")]
    Cancelled,

    #[error("Interview exceeded {0} rounds")]
    RoundLimit(usize),

    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Debug)]
pub enum DialogueOutcome {
    /// The interviewer said the closing phrase.
    Terminated,
    TimedOut,
    Failed(DialogueError),
}

impl DialogueOutcome {
    pub fn is_terminated(&self) -> bool {
        matches!(self, DialogueOutcome::Terminated)
    }
}

#[derive(Debug)]
pub struct RunReport {
    pub session_id: SessionId,
    pub outcome: DialogueOutcome,
    /// Agent turns produced by this run.
    pub turns: usize,
    /// Result of every transcript write, in order.
    pub writes: Vec<WriteOutcome>,
    pub elapsed: Duration,
}

pub struct DialogueEngine {
    store: Arc<dyn InterviewStore>,
    invoker: AgentInvoker,
    stats: Arc<dyn StatReporter>,
    models: AgentModels,
    limits: DialogueLimits,
    language: Language,
}

struct RunState {
    transcripts: Transcripts,
    turns: usize,
    writes: Vec<WriteOutcome>,
}

/// The fixed inputs of a run.
struct Participants {
    persona_system: String,
    interviewer_system: String,
    persona_tools: ToolSet,
    interviewer_tools: ToolSet,
}

impl DialogueEngine {
    pub fn new(
        store: Arc<dyn InterviewStore>,
        invoker: AgentInvoker,
        stats: Arc<dyn StatReporter>,
        models: AgentModels,
        limits: DialogueLimits,
        language: Language,
    ) -> Self {
        Self {
            store,
            invoker,
            stats,
            models,
            limits,
            language,
        }
    }

    pub fn language(&self) -> Language {
        self.language
    }

    pub fn limits(&self) -> &DialogueLimits {
        &self.limits
    }

    /// Run `session` to completion. Errors never escape: they are the
    /// `Failed` outcome.
    #[instrument(
        skip_all,
        name = "DialogueEngine::run",
        fields(session_id = %session.id, persona_id = %persona.id)
    )]
    pub async fn run(
        &self,
        session: Session,
        topic: &Topic,
        persona: &Persona,
        cancel: CancellationToken,
    ) -> RunReport {
        let started = Instant::now();
        let session_id = session.id;
        let lease = LeaseToken::generate();

        if let Err(e) = self.store.set_lease(session_id, Some(&lease)).await {
            warn!("Failed to claim session: {}", e);
            return RunReport {
                session_id,
                outcome: DialogueOutcome::Failed(e.into()),
                turns: 0,
                writes: Vec::new(),
                elapsed: started.elapsed(),
            };
        }

        let participants = Participants {
            persona_system: prompts::persona_system(self.language, persona),
            interviewer_system: prompts::interviewer_system(self.language, topic),
            persona_tools: ToolSet::for_role(AgentRole::Persona),
            interviewer_tools: ToolSet::for_role(AgentRole::Interviewer),
        };

        if let Err(e) = self
            .store
            .update_prompts(
                session_id,
                &participants.interviewer_system,
                &participants.persona_system,
            )
            .await
        {
            warn!("Failed to record prompts: {}", e);
        }

        let mut state = RunState {
            transcripts: if session.messages.is_empty() {
                Transcripts::seeded(prompts::prologue(self.language, topic))
            } else {
                info!(messages = session.messages.len(), "Resuming stored transcript");
                Transcripts::from_persona_view(session.messages)
            },
            turns: 0,
            writes: Vec::new(),
        };

        let run_token = cancel.child_token();
        let ctx = RunContext::interview(
            session_id,
            topic.id,
            persona.id,
            lease.clone(),
            run_token.clone(),
        );
        let watchdog = Watchdog::spawn(
            session_id,
            self.limits.timeout(),
            self.limits.tick(),
            run_token,
        );

        let result = self
            .drive(&participants, &mut state, &ctx, session_id, &lease)
            .await;
        let timed_out = watchdog.finish().await;

        let outcome = match result {
            Ok(()) => DialogueOutcome::Terminated,
            Err(_) if timed_out => DialogueOutcome::TimedOut,
            Err(e) => DialogueOutcome::Failed(e),
        };

        match self.store.release_lease(session_id, &lease).await {
            Ok(true) => {}
            Ok(false) => warn!("Lease was taken over before release"),
            Err(e) => warn!("Failed to release lease: {}", e),
        }

        let elapsed = started.elapsed();
        self.stats
            .report(UsageReport::duration(session_id, elapsed.as_secs()))
            .await;
        self.stats
            .report(UsageReport::steps(session_id, state.turns))
            .await;

        info!(
            turns = state.turns,
            elapsed_secs = elapsed.as_secs(),
            outcome = ?outcome,
            "Interview run finished"
        );

        RunReport {
            session_id,
            outcome,
            turns: state.turns,
            writes: state.writes,
            elapsed,
        }
    }

    async fn drive(
        &self,
        participants: &Participants,
        state: &mut RunState,
        ctx: &RunContext,
        session_id: SessionId,
        lease: &LeaseToken,
    ) -> Result<(), DialogueError> {
        let detector = TerminationDetector::new(self.language);

        if state
            .transcripts
            .last_interviewer_utterance()
            .is_some_and(|last| detector.is_terminal(last))
        {
            info!("Stored transcript already closed");
            return Ok(());
        }

        let mut rounds = 0;
        loop {
            if ctx.is_cancelled() {
                return Err(DialogueError::Cancelled);
            }

            let speaker = state.transcripts.next_speaker();
            if speaker == Speaker::Persona {
                if let Some(max) = self.limits.max_rounds
                    && rounds >= max
                {
                    return Err(DialogueError::RoundLimit(max));
                }
                rounds += 1;
            }

            let (model, system_prompt, toolset) = match speaker {
                Speaker::Persona => (
                    &self.models.persona,
                    participants.persona_system.as_str(),
                    &participants.persona_tools,
                ),
                Speaker::Interviewer => (
                    &self.models.interviewer,
                    participants.interviewer_system.as_str(),
                    &participants.interviewer_tools,
                ),
            };

            let invocation = self
                .invoker
                .invoke(
                    AgentTurn {
                        role: speaker.into(),
                        model,
                        system_prompt,
                        transcript: state.transcripts.view(speaker),
                        toolset,
                    },
                    ctx,
                )
                .await
                .map_err(|source| match source {
                    InvokeError::Cancelled => DialogueError::Cancelled,
                    source => DialogueError::Invocation {
                        role: speaker.into(),
                        source,
                    },
                })?;

            let closing =
                speaker == Speaker::Interviewer && detector.is_terminal(&invocation.message);
            state.transcripts.push(speaker, invocation.message);
            state.turns += 1;

            let outcome = self
                .store
                .write_messages(session_id, lease, state.transcripts.persona_view())
                .await;
            if let WriteOutcome::Failed { message } = &outcome {
                warn!(%speaker, "Failed to persist transcript: {}", message);
            }
            state.writes.push(outcome);

            if closing {
                return Ok(());
            }
        }
    }
}
