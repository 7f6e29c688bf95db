//! Persistence for topics, personas, scout runs, interview sessions and
//! usage records.
//!
//! Sessions carry a lease token. `set_lease` claims a session
//! unconditionally; `write_messages` and `release_lease` only take effect
//! while the caller's token is still the stored one. Two runs started on the
//! same session race: the later claim wins and the earlier run's writes come
//! back as [`WriteOutcome::Skipped`].

mod error;
pub mod memory;
pub mod sqlite;
pub mod types;

use async_trait::async_trait;

use crate::conversation::Message;

pub use error::StoreError;
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
pub use types::{
    ConclusionRecord, LeaseToken, NewPersona, NewTopic, NewUsage, Persona, PersonaId, ScoutRun,
    ScoutRunId, Session, SessionId, Topic, TopicId, TopicUpdate, UsageDimension, UsageRecord,
    WriteOutcome,
};

#[async_trait]
pub trait InterviewStore: Send + Sync {
    /// Return the session for the pair, creating an empty one if needed.
    /// Never resets an existing transcript.
    async fn upsert_session(
        &self,
        topic_id: TopicId,
        persona_id: PersonaId,
    ) -> Result<Session, StoreError>;

    async fn get_session(&self, session_id: SessionId) -> Result<Session, StoreError>;

    async fn find_session(
        &self,
        topic_id: TopicId,
        persona_id: PersonaId,
    ) -> Result<Option<Session>, StoreError>;

    async fn list_sessions_for_topic(&self, topic_id: TopicId)
    -> Result<Vec<Session>, StoreError>;

    async fn update_prompts(
        &self,
        session_id: SessionId,
        interviewer_prompt: &str,
        persona_prompt: &str,
    ) -> Result<(), StoreError>;

    async fn set_lease(
        &self,
        session_id: SessionId,
        token: Option<&LeaseToken>,
    ) -> Result<(), StoreError>;

    /// Clear the lease if `token` still holds it. Returns whether it did.
    async fn release_lease(
        &self,
        session_id: SessionId,
        token: &LeaseToken,
    ) -> Result<bool, StoreError>;

    /// Replace the stored transcript while `expected` holds the lease.
    /// Failures are reported in the outcome, never raised.
    async fn write_messages(
        &self,
        session_id: SessionId,
        expected: &LeaseToken,
        messages: &[Message],
    ) -> WriteOutcome;

    async fn save_conclusion(
        &self,
        session_id: SessionId,
        record: &ConclusionRecord,
    ) -> Result<(), StoreError>;

    async fn create_topic(&self, topic: NewTopic) -> Result<Topic, StoreError>;

    async fn get_topic(&self, topic_id: TopicId) -> Result<Topic, StoreError>;

    async fn update_topic(
        &self,
        topic_id: TopicId,
        update: TopicUpdate,
    ) -> Result<Topic, StoreError>;

    async fn save_study_summary(&self, topic_id: TopicId, summary: &str)
    -> Result<(), StoreError>;

    /// Most recent first.
    async fn list_topics(&self, limit: usize) -> Result<Vec<Topic>, StoreError>;

    async fn create_persona(&self, persona: NewPersona) -> Result<Persona, StoreError>;

    async fn get_persona(&self, persona_id: PersonaId) -> Result<Persona, StoreError>;

    async fn list_personas(&self) -> Result<Vec<Persona>, StoreError>;

    /// Personas saved by one scout run, newest first.
    async fn list_personas_for_scout_run(
        &self,
        scout_run_id: ScoutRunId,
    ) -> Result<Vec<Persona>, StoreError>;

    async fn create_scout_run(&self, description: &str) -> Result<ScoutRun, StoreError>;

    async fn get_scout_run(&self, scout_run_id: ScoutRunId) -> Result<ScoutRun, StoreError>;

    /// Replace the run's conversation.
    async fn save_scout_messages(
        &self,
        scout_run_id: ScoutRunId,
        messages: &[Message],
    ) -> Result<(), StoreError>;

    async fn record_usage(&self, usage: NewUsage) -> Result<UsageRecord, StoreError>;

    async fn usage_for_session(&self, session_id: SessionId)
    -> Result<Vec<UsageRecord>, StoreError>;
}
