use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::warn;

use super::types::{
    ConclusionRecord, LeaseToken, NewPersona, NewTopic, NewUsage, Persona, PersonaId, ScoutRun,
    ScoutRunId, Session, SessionId, Topic, TopicId, TopicUpdate, UsageRecord, WriteOutcome,
};
use super::{InterviewStore, StoreError};
use crate::conversation::Message;

#[derive(Default)]
struct Tables {
    topics: HashMap<TopicId, Topic>,
    personas: HashMap<PersonaId, Persona>,
    sessions: HashMap<SessionId, Session>,
    scout_runs: HashMap<ScoutRunId, ScoutRun>,
    usage: Vec<UsageRecord>,
    next_id: i64,
}

impl Tables {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Non-durable store. Transcript writes can be made to fail on demand.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
    fail_writes: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every following `write_messages` call report a failure.
    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Tables>, StoreError> {
        self.tables
            .read()
            .map_err(|_| StoreError::lock_poisoned("tables"))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Tables>, StoreError> {
        self.tables
            .write()
            .map_err(|_| StoreError::lock_poisoned("tables"))
    }

    fn with_session<T>(
        &self,
        session_id: SessionId,
        f: impl FnOnce(&mut Session) -> T,
    ) -> Result<T, StoreError> {
        let mut tables = self.write()?;
        let session = tables
            .sessions
            .get_mut(&session_id)
            .ok_or_else(|| StoreError::not_found("Session", session_id))?;
        let out = f(session);
        session.updated_at = Utc::now();
        Ok(out)
    }
}

#[async_trait]
impl InterviewStore for MemoryStore {
    async fn upsert_session(
        &self,
        topic_id: TopicId,
        persona_id: PersonaId,
    ) -> Result<Session, StoreError> {
        let mut tables = self.write()?;
        if !tables.topics.contains_key(&topic_id) {
            return Err(StoreError::not_found("Topic", topic_id));
        }
        if !tables.personas.contains_key(&persona_id) {
            return Err(StoreError::not_found("Persona", persona_id));
        }
        if let Some(existing) = tables
            .sessions
            .values()
            .find(|s| s.topic_id == topic_id && s.persona_id == persona_id)
        {
            return Ok(existing.clone());
        }

        let now = Utc::now();
        let session = Session {
            id: SessionId(tables.next_id()),
            topic_id,
            persona_id,
            interviewer_prompt: String::new(),
            persona_prompt: String::new(),
            messages: Vec::new(),
            conclusion: String::new(),
            persona_summary: String::new(),
            highlights: String::new(),
            lease: None,
            created_at: now,
            updated_at: now,
        };
        tables.sessions.insert(session.id, session.clone());
        Ok(session)
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Session, StoreError> {
        self.read()?
            .sessions
            .get(&session_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Session", session_id))
    }

    async fn find_session(
        &self,
        topic_id: TopicId,
        persona_id: PersonaId,
    ) -> Result<Option<Session>, StoreError> {
        Ok(self
            .read()?
            .sessions
            .values()
            .find(|s| s.topic_id == topic_id && s.persona_id == persona_id)
            .cloned())
    }

    async fn list_sessions_for_topic(
        &self,
        topic_id: TopicId,
    ) -> Result<Vec<Session>, StoreError> {
        let mut sessions: Vec<Session> = self
            .read()?
            .sessions
            .values()
            .filter(|s| s.topic_id == topic_id)
            .cloned()
            .collect();
        sessions.sort_by_key(|s| s.id);
        Ok(sessions)
    }

    async fn update_prompts(
        &self,
        session_id: SessionId,
        interviewer_prompt: &str,
        persona_prompt: &str,
    ) -> Result<(), StoreError> {
        self.with_session(session_id, |session| {
            session.interviewer_prompt = interviewer_prompt.to_string();
            session.persona_prompt = persona_prompt.to_string();
        })
    }

    async fn set_lease(
        &self,
        session_id: SessionId,
        token: Option<&LeaseToken>,
    ) -> Result<(), StoreError> {
        self.with_session(session_id, |session| session.lease = token.cloned())
    }

    async fn release_lease(
        &self,
        session_id: SessionId,
        token: &LeaseToken,
    ) -> Result<bool, StoreError> {
        self.with_session(session_id, |session| {
            if session.lease.as_ref() == Some(token) {
                session.lease = None;
                true
            } else {
                false
            }
        })
    }

    async fn write_messages(
        &self,
        session_id: SessionId,
        expected: &LeaseToken,
        messages: &[Message],
    ) -> WriteOutcome {
        if self.fail_writes.load(Ordering::SeqCst) {
            return WriteOutcome::Failed {
                message: "writes disabled".to_string(),
            };
        }

        let written = self.with_session(session_id, |session| {
            if session.lease.as_ref() != Some(expected) {
                return false;
            }
            session.messages = messages.to_vec();
            true
        });

        match written {
            Ok(true) => WriteOutcome::Written,
            Ok(false) | Err(StoreError::NotFound { .. }) => {
                warn!(
                    target: "store::memory",
                    %session_id,
                    "Lease no longer held, skipping transcript write"
                );
                WriteOutcome::Skipped
            }
            Err(e) => WriteOutcome::Failed {
                message: e.to_string(),
            },
        }
    }

    async fn save_conclusion(
        &self,
        session_id: SessionId,
        record: &ConclusionRecord,
    ) -> Result<(), StoreError> {
        self.with_session(session_id, |session| {
            session.conclusion = record.conclusion.clone();
            session.persona_summary = record.persona_summary.clone();
            session.highlights = record.highlights.clone();
        })
    }

    async fn create_topic(&self, topic: NewTopic) -> Result<Topic, StoreError> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let topic = Topic {
            id: TopicId(tables.next_id()),
            role: topic.role,
            topic: topic.topic,
            report: String::new(),
            study_summary: None,
            created_at: now,
            updated_at: now,
        };
        tables.topics.insert(topic.id, topic.clone());
        Ok(topic)
    }

    async fn get_topic(&self, topic_id: TopicId) -> Result<Topic, StoreError> {
        self.read()?
            .topics
            .get(&topic_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Topic", topic_id))
    }

    async fn update_topic(
        &self,
        topic_id: TopicId,
        update: TopicUpdate,
    ) -> Result<Topic, StoreError> {
        let mut tables = self.write()?;
        let topic = tables
            .topics
            .get_mut(&topic_id)
            .ok_or_else(|| StoreError::not_found("Topic", topic_id))?;
        if let Some(role) = update.role {
            topic.role = role;
        }
        if let Some(text) = update.topic {
            topic.topic = text;
        }
        if let Some(report) = update.report {
            topic.report = report;
        }
        topic.updated_at = Utc::now();
        Ok(topic.clone())
    }

    async fn save_study_summary(
        &self,
        topic_id: TopicId,
        summary: &str,
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let topic = tables
            .topics
            .get_mut(&topic_id)
            .ok_or_else(|| StoreError::not_found("Topic", topic_id))?;
        topic.study_summary = Some(summary.to_string());
        topic.updated_at = Utc::now();
        Ok(())
    }

    async fn list_topics(&self, limit: usize) -> Result<Vec<Topic>, StoreError> {
        let mut topics: Vec<Topic> = self.read()?.topics.values().cloned().collect();
        topics.sort_by(|a, b| b.id.cmp(&a.id));
        topics.truncate(limit);
        Ok(topics)
    }

    async fn create_persona(&self, persona: NewPersona) -> Result<Persona, StoreError> {
        let mut tables = self.write()?;
        let persona = Persona {
            id: PersonaId(tables.next_id()),
            name: persona.name,
            tags: persona.tags,
            prompt: persona.prompt,
            scout_run_id: persona.scout_run_id,
            created_at: Utc::now(),
        };
        tables.personas.insert(persona.id, persona.clone());
        Ok(persona)
    }

    async fn get_persona(&self, persona_id: PersonaId) -> Result<Persona, StoreError> {
        self.read()?
            .personas
            .get(&persona_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("Persona", persona_id))
    }

    async fn list_personas(&self) -> Result<Vec<Persona>, StoreError> {
        let mut personas: Vec<Persona> = self.read()?.personas.values().cloned().collect();
        personas.sort_by_key(|p| p.id);
        Ok(personas)
    }

    async fn list_personas_for_scout_run(
        &self,
        scout_run_id: ScoutRunId,
    ) -> Result<Vec<Persona>, StoreError> {
        let mut personas: Vec<Persona> = self
            .read()?
            .personas
            .values()
            .filter(|p| p.scout_run_id == Some(scout_run_id))
            .cloned()
            .collect();
        personas.sort_by(|a, b| b.id.cmp(&a.id));
        Ok(personas)
    }

    async fn create_scout_run(&self, description: &str) -> Result<ScoutRun, StoreError> {
        let mut tables = self.write()?;
        let now = Utc::now();
        let run = ScoutRun {
            id: ScoutRunId(tables.next_id()),
            description: description.to_string(),
            messages: Vec::new(),
            created_at: now,
            updated_at: now,
        };
        tables.scout_runs.insert(run.id, run.clone());
        Ok(run)
    }

    async fn get_scout_run(&self, scout_run_id: ScoutRunId) -> Result<ScoutRun, StoreError> {
        self.read()?
            .scout_runs
            .get(&scout_run_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found("ScoutRun", scout_run_id))
    }

    async fn save_scout_messages(
        &self,
        scout_run_id: ScoutRunId,
        messages: &[Message],
    ) -> Result<(), StoreError> {
        let mut tables = self.write()?;
        let run = tables
            .scout_runs
            .get_mut(&scout_run_id)
            .ok_or_else(|| StoreError::not_found("ScoutRun", scout_run_id))?;
        run.messages = messages.to_vec();
        run.updated_at = Utc::now();
        Ok(())
    }

    async fn record_usage(&self, usage: NewUsage) -> Result<UsageRecord, StoreError> {
        let mut tables = self.write()?;
        let record = UsageRecord {
            id: tables.next_id(),
            session_id: usage.session_id,
            dimension: usage.dimension,
            value: usage.value,
            metadata: usage.metadata,
            created_at: Utc::now(),
        };
        tables.usage.push(record.clone());
        Ok(record)
    }

    async fn usage_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<UsageRecord>, StoreError> {
        Ok(self
            .read()?
            .usage
            .iter()
            .filter(|u| u.session_id == Some(session_id))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn injected_failures_surface_as_outcomes() {
        let store = MemoryStore::new();
        let topic = store
            .create_topic(NewTopic {
                role: "r".to_string(),
                topic: "t".to_string(),
            })
            .await
            .unwrap();
        let persona = store.create_persona(NewPersona::default()).await.unwrap();
        let session = store.upsert_session(topic.id, persona.id).await.unwrap();
        let token = LeaseToken::generate();
        store.set_lease(session.id, Some(&token)).await.unwrap();

        store.fail_writes(true);
        let outcome = store
            .write_messages(session.id, &token, &[Message::user("hi")])
            .await;
        assert!(matches!(outcome, WriteOutcome::Failed { .. }));

        store.fail_writes(false);
        let outcome = store
            .write_messages(session.id, &token, &[Message::user("hi")])
            .await;
        assert_eq!(outcome, WriteOutcome::Written);
    }

    #[tokio::test]
    async fn stale_lease_writes_are_skipped() {
        let store = MemoryStore::new();
        let topic = store
            .create_topic(NewTopic {
                role: "r".to_string(),
                topic: "t".to_string(),
            })
            .await
            .unwrap();
        let persona = store.create_persona(NewPersona::default()).await.unwrap();
        let session = store.upsert_session(topic.id, persona.id).await.unwrap();
        let stale = LeaseToken::generate();
        store.set_lease(session.id, Some(&stale)).await.unwrap();
        store
            .set_lease(session.id, Some(&LeaseToken::generate()))
            .await
            .unwrap();

        let outcome = store
            .write_messages(session.id, &stale, &[Message::user("hi")])
            .await;
        assert_eq!(outcome, WriteOutcome::Skipped);
        assert!(store.get_session(session.id).await.unwrap().messages.is_empty());

        let outcome = store
            .write_messages(SessionId(404), &stale, &[Message::user("hi")])
            .await;
        assert_eq!(outcome, WriteOutcome::Skipped);
    }

    #[tokio::test]
    async fn scout_runs_own_the_personas_they_saved() {
        let store = MemoryStore::new();
        let run = store.create_scout_run("帮我寻找燕麦奶用户").await.unwrap();
        let other = store.create_scout_run("帮我寻找咖啡用户").await.unwrap();
        let saved = [
            ("A", Some(run.id)),
            ("B", Some(other.id)),
            ("C", Some(run.id)),
            ("D", None),
        ];
        for (name, scout_run_id) in saved {
            store
                .create_persona(NewPersona {
                    name: name.to_string(),
                    scout_run_id,
                    ..Default::default()
                })
                .await
                .unwrap();
        }

        let names: Vec<String> = store
            .list_personas_for_scout_run(run.id)
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.name)
            .collect();
        assert_eq!(names, vec!["C", "A"]);

        store
            .save_scout_messages(run.id, &[Message::user("帮我寻找燕麦奶用户")])
            .await
            .unwrap();
        assert_eq!(store.get_scout_run(run.id).await.unwrap().messages.len(), 1);
        assert!(matches!(
            store.get_scout_run(ScoutRunId(999)).await.unwrap_err(),
            StoreError::NotFound { entity: "ScoutRun", .. }
        ));
    }

    #[tokio::test]
    async fn unknown_persona_cannot_get_a_session() {
        let store = MemoryStore::new();
        let topic = store
            .create_topic(NewTopic {
                role: "r".to_string(),
                topic: "t".to_string(),
            })
            .await
            .unwrap();
        let err = store
            .upsert_session(topic.id, PersonaId(77))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::NotFound { entity: "Persona", .. }));
    }
}
