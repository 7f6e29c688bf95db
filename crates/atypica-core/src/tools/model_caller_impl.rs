use std::sync::Arc;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiError, CompletionResponse, Provider, StreamError, collect_response};
use crate::config::model::ModelId;
use crate::conversation::Message;
use crate::tools::services::{ModelCallError, ModelCaller};

pub struct DefaultModelCaller {
    provider: Arc<dyn Provider>,
}

impl DefaultModelCaller {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ModelCaller for DefaultModelCaller {
    async fn call(
        &self,
        model: &ModelId,
        messages: Vec<Message>,
        system: Option<String>,
        cancel_token: CancellationToken,
    ) -> Result<CompletionResponse, ModelCallError> {
        let stream = self
            .provider
            .stream_complete(model, messages, system, None, cancel_token)
            .await
            .map_err(|e| match e {
                ApiError::Cancelled { .. } => ModelCallError::Cancelled,
                other => ModelCallError::Api(other.to_string()),
            })?;

        collect_response(stream).await.map_err(|e| match e {
            StreamError::Cancelled => ModelCallError::Cancelled,
            other => ModelCallError::Api(other.to_string()),
        })
    }
}
