use std::sync::Arc;

use futures::future::join_all;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, instrument, warn};

use super::engine::{DialogueEngine, DialogueOutcome};
use crate::error::{Error, Result};
use crate::store::{InterviewStore, PersonaId, StoreError, TopicId};

/// A persona requested for a batch, as the caller names it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersonaRef {
    pub id: PersonaId,
    pub name: String,
}

impl PersonaRef {
    pub fn new(id: PersonaId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
        }
    }
}

/// Outcome of one persona's interview within a batch.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InterviewResult {
    pub topic_id: TopicId,
    pub persona_id: PersonaId,
    pub persona_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub conclusion: Option<String>,
    pub result: String,
}

/// Fans a topic out to several personas, one dialogue engine run each.
pub struct BatchCoordinator {
    store: Arc<dyn InterviewStore>,
    engine: Arc<DialogueEngine>,
}

impl BatchCoordinator {
    pub fn new(store: Arc<dyn InterviewStore>, engine: Arc<DialogueEngine>) -> Self {
        Self { store, engine }
    }

    /// Run every persona concurrently. One entry per requested persona comes
    /// back, in request order; a failing run only affects its own entry.
    #[instrument(skip_all, name = "BatchCoordinator::run_batch", fields(topic_id = %topic_id, personas = personas.len()))]
    pub async fn run_batch(
        &self,
        topic_id: TopicId,
        personas: &[PersonaRef],
        cancel: CancellationToken,
    ) -> Result<Vec<InterviewResult>> {
        let max = self.engine.limits().max_personas;
        if personas.len() > max {
            return Err(Error::InvalidOperation(format!(
                "a batch takes at most {max} personas, got {}",
                personas.len()
            )));
        }

        let results = join_all(
            personas
                .iter()
                .map(|persona| self.run_single(topic_id, persona, cancel.child_token())),
        )
        .await;

        let settle = self.engine.limits().settle();
        if !settle.is_zero() {
            info!(settle_secs = settle.as_secs(), "All interviews settled, waiting before returning");
            tokio::time::sleep(settle).await;
        }

        Ok(results)
    }

    #[instrument(skip_all, fields(persona_id = %persona.id))]
    async fn run_single(
        &self,
        topic_id: TopicId,
        persona: &PersonaRef,
        cancel: CancellationToken,
    ) -> InterviewResult {
        let language = self.engine.language();
        let mut result = InterviewResult {
            topic_id,
            persona_id: persona.id,
            persona_name: persona.name.clone(),
            conclusion: None,
            result: String::new(),
        };

        match self.interview(topic_id, persona.id, cancel).await {
            Ok(Some(conclusion)) => {
                result.conclusion = (!conclusion.is_empty()).then_some(conclusion);
                result.result = language.concluded_message().to_string();
            }
            Ok(None) => {
                warn!("Interview timed out");
                result.result = language.problem_message("Interview timeout");
            }
            Err(e) => {
                error!("Interview failed: {}", e);
                result.result = language.problem_message(&e.to_string());
            }
        }

        result
    }

    /// `Ok(Some(conclusion))` when the interview closed, `Ok(None)` when the
    /// watchdog stopped it.
    async fn interview(
        &self,
        topic_id: TopicId,
        persona_id: PersonaId,
        cancel: CancellationToken,
    ) -> std::result::Result<Option<String>, RunFailure> {
        let topic = self.store.get_topic(topic_id).await?;
        let persona = self.store.get_persona(persona_id).await?;
        let session = self.store.upsert_session(topic_id, persona_id).await?;

        let report = self.engine.run(session, &topic, &persona, cancel).await;
        match report.outcome {
            DialogueOutcome::Terminated => {
                let session = self.store.get_session(report.session_id).await?;
                Ok(Some(session.conclusion))
            }
            DialogueOutcome::TimedOut => Ok(None),
            DialogueOutcome::Failed(e) => Err(RunFailure::Dialogue(e)),
        }
    }
}

#[derive(Debug, thiserror::Error)]
enum RunFailure {
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Dialogue(super::engine::DialogueError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_serialize_in_camel_case() {
        let result = InterviewResult {
            topic_id: TopicId(1),
            persona_id: PersonaId(10),
            persona_name: "A".to_string(),
            conclusion: None,
            result: "访谈结束".to_string(),
        };
        let value = serde_json::to_value(&result).unwrap();
        assert_eq!(value["topicId"], 1);
        assert_eq!(value["personaName"], "A");
        assert!(value.get("conclusion").is_none());
    }
}
