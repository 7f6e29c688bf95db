use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use strum_macros::{Display, EnumString};

use crate::conversation::Message;

macro_rules! record_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl From<i64> for $name {
            fn from(id: i64) -> Self {
                Self(id)
            }
        }
    };
}

record_id!(
    /// A research topic (the interviewer's brief).
    TopicId
);
record_id!(PersonaId);
record_id!(
    /// One interviewer/persona pairing under a topic.
    SessionId
);
record_id!(
    /// A conversation with the scout agent that produces personas.
    ScoutRunId
);

/// Ownership claim on a session held by the run currently driving it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseToken(pub String);

impl LeaseToken {
    pub fn generate() -> Self {
        Self(uuid::Uuid::now_v7().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LeaseToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Topic {
    pub id: TopicId,
    /// The role the interviewer plays.
    pub role: String,
    pub topic: String,
    pub report: String,
    pub study_summary: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTopic {
    pub role: String,
    pub topic: String,
}

#[derive(Debug, Clone, Default)]
pub struct TopicUpdate {
    pub role: Option<String>,
    pub topic: Option<String>,
    pub report: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Persona {
    pub id: PersonaId,
    pub name: String,
    pub tags: Vec<String>,
    /// Behavioral prompt the persona agent plays from.
    pub prompt: String,
    /// The scouting run that produced this persona, if any.
    pub scout_run_id: Option<ScoutRunId>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default)]
pub struct NewPersona {
    pub name: String,
    pub tags: Vec<String>,
    pub prompt: String,
    pub scout_run_id: Option<ScoutRunId>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoutRun {
    pub id: ScoutRunId,
    /// The request that started the run ("帮我寻找…").
    pub description: String,
    /// Scout-side conversation: user requests and the scout's replies.
    pub messages: Vec<Message>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    pub id: SessionId,
    pub topic_id: TopicId,
    pub persona_id: PersonaId,
    pub interviewer_prompt: String,
    pub persona_prompt: String,
    /// Persona-side transcript.
    pub messages: Vec<Message>,
    pub conclusion: String,
    pub persona_summary: String,
    pub highlights: String,
    pub lease: Option<LeaseToken>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Session {
    pub fn is_concluded(&self) -> bool {
        !self.conclusion.is_empty()
    }

    /// A session without a lease is idle and may be resumed.
    pub fn is_leased(&self) -> bool {
        self.lease.is_some()
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ConclusionRecord {
    pub conclusion: String,
    pub persona_summary: String,
    pub highlights: String,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum UsageDimension {
    Tokens,
    Duration,
    Steps,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewUsage {
    pub session_id: Option<SessionId>,
    pub dimension: UsageDimension,
    pub value: i64,
    pub metadata: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: i64,
    pub session_id: Option<SessionId>,
    pub dimension: UsageDimension,
    pub value: i64,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Result of a best-effort transcript write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WriteOutcome {
    Written,
    /// The session's lease belongs to another run (or was released).
    Skipped,
    Failed { message: String },
}

impl WriteOutcome {
    pub fn is_written(&self) -> bool {
        matches!(self, WriteOutcome::Written)
    }
}
