//! Test doubles shared by unit tests, integration tests and downstream
//! crates: a deterministic generation service, canned note search, a
//! recording stat sink and store seeding helpers.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tokio_util::sync::CancellationToken;

use atypica_tools::result::{NoteAuthor, NoteSummary};
use atypica_tools::tools::content_search::ContentSearchError;
use atypica_tools::{ToolCall, ToolSchema};

use crate::api::{
    ApiError, AssistantContent, CompletionResponse, CompletionStream, Provider, StreamChunk,
    StreamError, TokenUsage,
};
use crate::config::model::ModelId;
use crate::conversation::Message;
use crate::stats::{StatReporter, UsageReport};
use crate::tools::ContentSearch;
use crate::store::{
    InterviewStore, NewPersona, NewTopic, Persona, Session, StoreError, Topic,
};

const PROVIDER_NAME: &str = "scripted";

fn locked<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}

/// What the scripted service does with one generation step.
#[derive(Debug, Clone)]
pub enum ScriptedReply {
    Response(CompletionResponse),
    Error(StreamError),
    /// Never answers; only cancellation ends the step.
    Hang,
}

impl ScriptedReply {
    pub fn text(text: impl Into<String>) -> Self {
        ScriptedReply::Response(CompletionResponse {
            content: vec![AssistantContent::Text { text: text.into() }],
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 5,
                total_tokens: 15,
            },
        })
    }

    pub fn tool_call(name: &str, parameters: serde_json::Value) -> Self {
        ScriptedReply::Response(CompletionResponse {
            content: vec![AssistantContent::ToolCall {
                tool_call: ToolCall {
                    name: name.to_string(),
                    parameters,
                    id: format!("call_{}", uuid::Uuid::new_v4().simple()),
                },
            }],
            usage: TokenUsage {
                prompt_tokens: 10,
                completion_tokens: 3,
                total_tokens: 13,
            },
        })
    }

    pub fn failure(message: impl Into<String>) -> Self {
        ScriptedReply::Error(StreamError::Provider {
            provider: PROVIDER_NAME.to_string(),
            message: message.into(),
        })
    }

    pub fn hang() -> Self {
        ScriptedReply::Hang
    }
}

/// One request as the scripted service saw it.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub model: ModelId,
    pub messages: Vec<Message>,
    pub system: Option<String>,
    /// Names of the offered tools.
    pub tools: Vec<String>,
}

type Responder = Box<dyn Fn(&RecordedRequest) -> ScriptedReply + Send + Sync>;

enum Script {
    Queue(Mutex<VecDeque<ScriptedReply>>),
    Responder(Responder),
}

/// Deterministic generation service. Replies come from a queue, or from a
/// function of the request when the reply depends on who is asking.
pub struct ScriptedProvider {
    script: Script,
    delay: Option<Duration>,
    requests: Mutex<Vec<RecordedRequest>>,
}

impl ScriptedProvider {
    /// Replies in order; an exhausted queue answers with a provider error.
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            script: Script::Queue(Mutex::new(replies.into())),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn with_responder<F>(responder: F) -> Self
    where
        F: Fn(&RecordedRequest) -> ScriptedReply + Send + Sync + 'static,
    {
        Self {
            script: Script::Responder(Box::new(responder)),
            delay: None,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Wait this long before answering each step.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        locked(&self.requests).clone()
    }

    fn next_reply(&self, request: &RecordedRequest) -> ScriptedReply {
        match &self.script {
            Script::Queue(queue) => locked(queue)
                .pop_front()
                .unwrap_or_else(|| ScriptedReply::failure("script exhausted")),
            Script::Responder(responder) => responder(request),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn stream_complete(
        &self,
        model: &ModelId,
        messages: Vec<Message>,
        system: Option<String>,
        tools: Option<Vec<ToolSchema>>,
        token: CancellationToken,
    ) -> Result<CompletionStream, ApiError> {
        let request = RecordedRequest {
            model: model.clone(),
            messages,
            system,
            tools: tools
                .unwrap_or_default()
                .into_iter()
                .map(|schema| schema.name)
                .collect(),
        };
        let reply = self.next_reply(&request);
        locked(&self.requests).push(request);

        let cancelled = || ApiError::Cancelled {
            provider: PROVIDER_NAME.to_string(),
        };

        if let Some(delay) = self.delay {
            tokio::select! {
                () = token.cancelled() => return Err(cancelled()),
                () = tokio::time::sleep(delay) => {}
            }
        }

        let chunks = match reply {
            ScriptedReply::Response(response) => vec![
                StreamChunk::Usage(response.usage),
                StreamChunk::MessageComplete(response),
            ],
            ScriptedReply::Error(err) => vec![StreamChunk::Error(err)],
            ScriptedReply::Hang => {
                token.cancelled().await;
                return Err(cancelled());
            }
        };

        Ok(Box::pin(futures::stream::iter(chunks)))
    }
}

/// Answers every search and author listing with the same notes, and
/// remembers what was asked (`search:<keyword>`, `user:<id>`).
#[derive(Default)]
pub struct StaticContentSearch {
    notes: Vec<NoteSummary>,
    queries: Mutex<Vec<String>>,
}

impl StaticContentSearch {
    pub fn new(notes: Vec<NoteSummary>) -> Self {
        Self {
            notes,
            queries: Mutex::new(Vec::new()),
        }
    }

    pub fn queries(&self) -> Vec<String> {
        locked(&self.queries).clone()
    }
}

#[async_trait]
impl ContentSearch for StaticContentSearch {
    async fn search(&self, keyword: &str) -> Result<Vec<NoteSummary>, ContentSearchError> {
        locked(&self.queries).push(format!("search:{keyword}"));
        Ok(self.notes.clone())
    }

    async fn user_notes(&self, user_id: &str) -> Result<Vec<NoteSummary>, ContentSearchError> {
        locked(&self.queries).push(format!("user:{user_id}"));
        Ok(self
            .notes
            .iter()
            .filter(|note| note.author.user_id == user_id)
            .cloned()
            .collect())
    }
}

/// A note by `user_id` with a few likes.
pub fn note(id: &str, user_id: &str, title: &str) -> NoteSummary {
    NoteSummary {
        id: id.to_string(),
        title: title.to_string(),
        desc: String::new(),
        liked_count: 12,
        collected_count: 3,
        comments_count: 1,
        author: NoteAuthor {
            nickname: format!("user {user_id}"),
            user_id: user_id.to_string(),
        },
    }
}

/// Keeps every report it receives.
#[derive(Default)]
pub struct RecordingStatReporter {
    reports: Mutex<Vec<UsageReport>>,
}

impl RecordingStatReporter {
    pub fn reports(&self) -> Vec<UsageReport> {
        locked(&self.reports).clone()
    }
}

#[async_trait]
impl StatReporter for RecordingStatReporter {
    async fn report(&self, report: UsageReport) {
        locked(&self.reports).push(report);
    }
}

/// A topic, a persona with `persona_prompt`, and their (empty) session.
pub async fn seed_interview(
    store: &dyn InterviewStore,
    persona_prompt: &str,
) -> Result<(Topic, Persona, Session), StoreError> {
    let topic = store
        .create_topic(NewTopic {
            role: "咖啡品牌研究员".to_string(),
            topic: "燕麦拿铁新品".to_string(),
        })
        .await?;
    let persona = store
        .create_persona(NewPersona {
            name: "Lin".to_string(),
            prompt: persona_prompt.to_string(),
            ..NewPersona::default()
        })
        .await?;
    let session = store.upsert_session(topic.id, persona.id).await?;
    Ok((topic, persona, session))
}
