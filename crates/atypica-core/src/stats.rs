//! Best-effort usage telemetry.
//!
//! Reporting never fails the caller: sinks log their own errors.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::warn;

use crate::agent::{AgentRole, RunScope};
use crate::api::TokenUsage;
use crate::store::{InterviewStore, NewUsage, ScoutRunId, SessionId, UsageDimension};

pub const REPORTED_BY_INTERVIEW: &str = "interview";
pub const REPORTED_BY_SCOUT: &str = "scout";

/// Source label for reports produced while running `scope`.
pub fn reporter_for(scope: &RunScope) -> &'static str {
    match scope {
        RunScope::Interview { .. } => REPORTED_BY_INTERVIEW,
        RunScope::Scout { .. } => REPORTED_BY_SCOUT,
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct UsageReport {
    pub session_id: Option<SessionId>,
    pub dimension: UsageDimension,
    pub value: i64,
    pub metadata: serde_json::Value,
}

impl UsageReport {
    /// Scout runs have no session; their id travels in the metadata.
    pub fn tokens(
        scope: &RunScope,
        role: AgentRole,
        usage: TokenUsage,
        reported_by: &str,
    ) -> Self {
        let mut metadata = json!({
            "reported_by": reported_by,
            "role": role.stat_label(),
            "prompt_tokens": usage.prompt_tokens,
            "completion_tokens": usage.completion_tokens,
        });
        let session_id = match scope {
            RunScope::Interview { session_id, .. } => {
                metadata["session_id"] = json!(session_id);
                Some(*session_id)
            }
            RunScope::Scout { scout_run_id } => {
                metadata["scout_run_id"] = json!(scout_run_id);
                None
            }
        };
        Self {
            session_id,
            dimension: UsageDimension::Tokens,
            value: i64::from(usage.total_tokens),
            metadata,
        }
    }

    /// Wall-clock seconds a run took.
    pub fn duration(session_id: SessionId, seconds: u64) -> Self {
        Self {
            session_id: Some(session_id),
            dimension: UsageDimension::Duration,
            value: i64::try_from(seconds).unwrap_or(i64::MAX),
            metadata: json!({
                "reported_by": REPORTED_BY_INTERVIEW,
                "session_id": session_id,
            }),
        }
    }

    /// Number of agent turns a run took.
    pub fn steps(session_id: SessionId, steps: usize) -> Self {
        Self {
            session_id: Some(session_id),
            dimension: UsageDimension::Steps,
            value: i64::try_from(steps).unwrap_or(i64::MAX),
            metadata: json!({
                "reported_by": REPORTED_BY_INTERVIEW,
                "session_id": session_id,
            }),
        }
    }

    /// Generation steps one scouting pass took.
    pub fn scout_steps(scout_run_id: ScoutRunId, steps: usize) -> Self {
        Self {
            session_id: None,
            dimension: UsageDimension::Steps,
            value: i64::try_from(steps).unwrap_or(i64::MAX),
            metadata: json!({
                "reported_by": REPORTED_BY_SCOUT,
                "scout_run_id": scout_run_id,
            }),
        }
    }
}

#[async_trait]
pub trait StatReporter: Send + Sync {
    async fn report(&self, report: UsageReport);
}

/// Writes reports as usage records.
pub struct StoreStatReporter {
    store: Arc<dyn InterviewStore>,
}

impl StoreStatReporter {
    pub fn new(store: Arc<dyn InterviewStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl StatReporter for StoreStatReporter {
    async fn report(&self, report: UsageReport) {
        let dimension = report.dimension;
        let usage = NewUsage {
            session_id: report.session_id,
            dimension,
            value: report.value,
            metadata: report.metadata,
        };
        if let Err(e) = self.store.record_usage(usage).await {
            warn!(target: "stats", %dimension, "Failed to record usage: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, NewPersona, NewTopic};

    #[test]
    fn token_reports_carry_role_and_source() {
        let scope = RunScope::Interview {
            session_id: SessionId(7),
            topic_id: crate::store::TopicId(1),
            persona_id: crate::store::PersonaId(2),
            lease: crate::store::LeaseToken::generate(),
        };
        let report = UsageReport::tokens(
            &scope,
            AgentRole::Interviewer,
            TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
            REPORTED_BY_INTERVIEW,
        );
        assert_eq!(report.value, 15);
        assert_eq!(report.metadata["role"], "interviewer");
        assert_eq!(report.metadata["session_id"], 7);
        assert_eq!(report.session_id, Some(SessionId(7)));
    }

    #[test]
    fn scout_reports_carry_the_run_instead_of_a_session() {
        let scope = RunScope::Scout {
            scout_run_id: ScoutRunId(4),
        };
        let report = UsageReport::tokens(
            &scope,
            AgentRole::Scout,
            TokenUsage {
                prompt_tokens: 1,
                completion_tokens: 1,
                total_tokens: 2,
            },
            reporter_for(&scope),
        );
        assert_eq!(report.session_id, None);
        assert_eq!(report.metadata["scout_run_id"], 4);
        assert_eq!(report.metadata["reported_by"], REPORTED_BY_SCOUT);
        assert!(report.metadata.get("session_id").is_none());
    }

    #[tokio::test]
    async fn store_reporter_writes_usage_records() {
        let store = Arc::new(MemoryStore::new());
        let topic = store
            .create_topic(NewTopic {
                role: "r".to_string(),
                topic: "t".to_string(),
            })
            .await
            .unwrap();
        let persona = store.create_persona(NewPersona::default()).await.unwrap();
        let session = store.upsert_session(topic.id, persona.id).await.unwrap();

        let reporter = StoreStatReporter::new(store.clone());
        reporter.report(UsageReport::steps(session.id, 6)).await;

        let usage = store.usage_for_session(session.id).await.unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].dimension, UsageDimension::Steps);
        assert_eq!(usage[0].value, 6);
    }
}
