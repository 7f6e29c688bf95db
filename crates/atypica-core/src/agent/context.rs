use std::fmt;

use serde::{Deserialize, Serialize};
use strum_macros::Display;
use tokio_util::sync::CancellationToken;

use crate::store::{LeaseToken, PersonaId, ScoutRunId, SessionId, TopicId};

/// The agents the invoker can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum AgentRole {
    Persona,
    Interviewer,
    /// Finds real users and writes them up as personas.
    Scout,
}

impl AgentRole {
    /// Label attached to usage reports.
    pub fn stat_label(self) -> &'static str {
        match self {
            AgentRole::Persona => "persona",
            AgentRole::Interviewer => "interviewer",
            AgentRole::Scout => "scout",
        }
    }
}

/// What a run is working on.
#[derive(Debug, Clone, PartialEq)]
pub enum RunScope {
    Interview {
        session_id: SessionId,
        topic_id: TopicId,
        persona_id: PersonaId,
        lease: LeaseToken,
    },
    Scout {
        scout_run_id: ScoutRunId,
    },
}

impl fmt::Display for RunScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunScope::Interview { session_id, .. } => write!(f, "session {session_id}"),
            RunScope::Scout { scout_run_id } => write!(f, "scout run {scout_run_id}"),
        }
    }
}

/// Everything a single run knows about what it drives. Owned by the runner
/// and lent to the invoker and tools for the duration of a turn.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub scope: RunScope,
    pub cancel_token: CancellationToken,
}

impl RunContext {
    pub fn interview(
        session_id: SessionId,
        topic_id: TopicId,
        persona_id: PersonaId,
        lease: LeaseToken,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            scope: RunScope::Interview {
                session_id,
                topic_id,
                persona_id,
                lease,
            },
            cancel_token,
        }
    }

    pub fn scout(scout_run_id: ScoutRunId, cancel_token: CancellationToken) -> Self {
        Self {
            scope: RunScope::Scout { scout_run_id },
            cancel_token,
        }
    }

    pub fn session_id(&self) -> Option<SessionId> {
        match &self.scope {
            RunScope::Interview { session_id, .. } => Some(*session_id),
            RunScope::Scout { .. } => None,
        }
    }

    pub fn scout_run_id(&self) -> Option<ScoutRunId> {
        match &self.scope {
            RunScope::Scout { scout_run_id } => Some(*scout_run_id),
            RunScope::Interview { .. } => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancel_token.is_cancelled()
    }
}
