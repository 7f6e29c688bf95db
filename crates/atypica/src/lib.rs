pub mod cli;
pub mod commands;

pub use atypica_core::{config, interview, store};

use eyre::{Result, eyre};
use std::sync::Arc;
use tracing::info;

use atypica_core::agent::AgentInvoker;
use atypica_core::api::{OpenAiProvider, Provider};
use atypica_core::config::Settings;
use atypica_core::interview::{BatchCoordinator, DialogueEngine};
use atypica_core::scout::ScoutRunner;
use atypica_core::stats::{StatReporter, StoreStatReporter};
use atypica_core::store::{InterviewStore, SqliteStore};
use atypica_core::tools::{DefaultModelCaller, HttpContentSearch, ToolServices};

pub async fn open_store(settings: &Settings) -> Result<Arc<SqliteStore>> {
    let path = settings.database_path()?;
    let store = SqliteStore::new(&path)
        .await
        .map_err(|e| eyre!("Failed to open database at {}: {}", path.display(), e))?;
    Ok(Arc::new(store))
}

/// Everything an interview batch or a scouting run needs, wired from
/// settings.
pub struct InterviewRuntime {
    pub store: Arc<dyn InterviewStore>,
    pub coordinator: BatchCoordinator,
    pub scout: ScoutRunner,
}

impl InterviewRuntime {
    pub async fn build(settings: &Settings) -> Result<Self> {
        let api_key = settings.api.api_key.as_deref().ok_or_else(|| {
            eyre!("No API key configured. Set ATYPICA_API_KEY or OPENAI_API_KEY.")
        })?;
        let provider: Arc<dyn Provider> = Arc::new(OpenAiProvider::new(
            api_key,
            settings.api.base_url.as_deref(),
        )?);

        let store: Arc<dyn InterviewStore> = open_store(settings).await?;
        let stats: Arc<dyn StatReporter> = Arc::new(StoreStatReporter::new(store.clone()));

        let mut services = ToolServices::new(store.clone(), stats.clone()).with_model_caller(
            Arc::new(DefaultModelCaller::new(provider.clone())),
            settings.models.reasoning.clone(),
        );
        match (&settings.search.base_url, &settings.search.token) {
            (Some(base_url), Some(token)) => {
                services = services
                    .with_content_search(Arc::new(HttpContentSearch::new(base_url, token)));
            }
            _ => info!("Content search not configured; personas answer and scouts run without it"),
        }

        let invoker = AgentInvoker::new(
            provider,
            Arc::new(services),
            stats.clone(),
            settings.limits.max_steps,
        );
        let scout = ScoutRunner::new(
            store.clone(),
            &invoker,
            stats.clone(),
            settings.models.scout.clone(),
            settings.language,
            settings.limits.scout_max_steps,
        );
        let engine = Arc::new(DialogueEngine::new(
            store.clone(),
            invoker,
            stats,
            settings.models.clone(),
            settings.limits.clone(),
            settings.language,
        ));

        Ok(Self {
            coordinator: BatchCoordinator::new(store.clone(), engine),
            store,
            scout,
        })
    }
}
