use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use atypica_tools::result::NoteSummary;
use atypica_tools::tools::content_search::ContentSearchError;

use super::capability::Capabilities;
use crate::api::CompletionResponse;
use crate::config::model::ModelId;
use crate::conversation::Message;
use crate::stats::StatReporter;
use crate::store::InterviewStore;

/// One-shot completion without tools.
#[async_trait]
pub trait ModelCaller: Send + Sync {
    async fn call(
        &self,
        model: &ModelId,
        messages: Vec<Message>,
        system: Option<String>,
        cancel_token: CancellationToken,
    ) -> Result<CompletionResponse, ModelCallError>;
}

#[derive(Debug, Clone, thiserror::Error)]
pub enum ModelCallError {
    #[error("API error: {0}")]
    Api(String),

    #[error("Cancelled")]
    Cancelled,
}

/// Social-note lookups: personas ground their answers in them, scouts find
/// real users through them.
#[async_trait]
pub trait ContentSearch: Send + Sync {
    async fn search(&self, keyword: &str) -> Result<Vec<NoteSummary>, ContentSearchError>;

    /// Notes published by one author.
    async fn user_notes(&self, user_id: &str) -> Result<Vec<NoteSummary>, ContentSearchError>;
}

pub struct ToolServices {
    pub store: Arc<dyn InterviewStore>,
    pub stats: Arc<dyn StatReporter>,

    model_caller: Option<(Arc<dyn ModelCaller>, ModelId)>,
    content_search: Option<Arc<dyn ContentSearch>>,

    available_capabilities: Capabilities,
}

impl ToolServices {
    pub fn new(store: Arc<dyn InterviewStore>, stats: Arc<dyn StatReporter>) -> Self {
        Self {
            store,
            stats,
            model_caller: None,
            content_search: None,
            available_capabilities: Capabilities::STORE,
        }
    }

    /// `model` is what the caller is asked to run.
    pub fn with_model_caller(mut self, caller: Arc<dyn ModelCaller>, model: ModelId) -> Self {
        self.model_caller = Some((caller, model));
        self.available_capabilities |= Capabilities::MODEL_CALLER;
        self
    }

    pub fn with_content_search(mut self, search: Arc<dyn ContentSearch>) -> Self {
        self.content_search = Some(search);
        self.available_capabilities |= Capabilities::NETWORK;
        self
    }

    pub fn capabilities(&self) -> Capabilities {
        self.available_capabilities
    }

    pub fn model_caller(&self) -> Option<(&Arc<dyn ModelCaller>, &ModelId)> {
        self.model_caller
            .as_ref()
            .map(|(caller, model)| (caller, model))
    }

    pub fn content_search(&self) -> Option<&Arc<dyn ContentSearch>> {
        self.content_search.as_ref()
    }
}

impl std::fmt::Debug for ToolServices {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolServices")
            .field("capabilities", &self.available_capabilities)
            .finish_non_exhaustive()
    }
}
