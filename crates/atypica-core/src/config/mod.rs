//! Runtime settings.
//!
//! Settings come from `settings.toml` in the user config directory and are
//! then overridden by environment variables. A settings file that fails to
//! parse is reported and ignored.

pub mod limits;
pub mod model;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Error, Result};
use crate::interview::prompts::Language;
use crate::utils::paths::AppPaths;

pub use limits::DialogueLimits;
pub use model::{AgentModels, ModelId};

pub const ENV_API_KEY: &str = "ATYPICA_API_KEY";
pub const ENV_OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const ENV_API_BASE_URL: &str = "ATYPICA_API_BASE_URL";
pub const ENV_SEARCH_BASE_URL: &str = "ATYPICA_SEARCH_BASE_URL";
pub const ENV_SEARCH_TOKEN: &str = "ATYPICA_SEARCH_TOKEN";
pub const ENV_DB: &str = "ATYPICA_DB";

const DB_FILE_NAME: &str = "atypica.db";

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ApiSettings {
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct SearchSettings {
    pub base_url: Option<String>,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Settings {
    #[serde(default)]
    pub api: ApiSettings,

    #[serde(default)]
    pub search: SearchSettings,

    #[serde(default)]
    pub models: AgentModels,

    #[serde(default)]
    pub limits: DialogueLimits,

    #[serde(default)]
    pub language: Language,

    pub database: Option<PathBuf>,
}

impl Settings {
    /// Get the path to the settings file
    pub fn config_path() -> Result<PathBuf> {
        AppPaths::user_config_dir()
            .map(|dir| dir.join("settings.toml"))
            .ok_or_else(|| Error::Configuration("Could not determine config directory".to_string()))
    }

    /// Load settings from disk (or defaults) and apply environment overrides.
    pub fn load() -> Result<Self> {
        let mut settings = Self::load_file()?;
        settings.apply_overrides(|key| std::env::var(key).ok());
        Ok(settings)
    }

    fn load_file() -> Result<Self> {
        let path = Self::config_path()?;
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&path)?;
        Ok(Self::parse(&contents).unwrap_or_else(|e| {
            tracing::warn!(
                "Failed to parse settings file at {:?}: {}. Using defaults.",
                path,
                e
            );
            Self::default()
        }))
    }

    pub fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Overlay values found through `lookup` (normally the process environment).
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let lookup = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        if let Some(key) = lookup(ENV_API_KEY).or_else(|| lookup(ENV_OPENAI_API_KEY)) {
            self.api.api_key = Some(key);
        }
        if let Some(url) = lookup(ENV_API_BASE_URL) {
            self.api.base_url = Some(url);
        }
        if let Some(url) = lookup(ENV_SEARCH_BASE_URL) {
            self.search.base_url = Some(url);
        }
        if let Some(token) = lookup(ENV_SEARCH_TOKEN) {
            self.search.token = Some(token);
        }
        if let Some(db) = lookup(ENV_DB) {
            self.database = Some(PathBuf::from(db));
        }
    }

    /// Where the SQLite database lives.
    pub fn database_path(&self) -> Result<PathBuf> {
        if let Some(path) = &self.database {
            return Ok(path.clone());
        }
        AppPaths::user_data_dir()
            .map(|dir| dir.join(DB_FILE_NAME))
            .ok_or_else(|| Error::Configuration("Could not determine data directory".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn empty_file_gives_defaults() {
        let settings = Settings::parse("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.limits.timeout_secs, 600);
        assert_eq!(settings.models.persona.as_str(), "gpt-4o-mini");
        assert_eq!(settings.language, Language::Zh);
    }

    #[test]
    fn partial_sections_keep_other_defaults() {
        let settings = Settings::parse(
            r#"
language = "en"

[models]
interviewer = "gpt-4.1"

[limits]
max_rounds = 10
"#,
        )
        .unwrap();

        assert_eq!(settings.models.interviewer.as_str(), "gpt-4.1");
        assert_eq!(settings.models.reasoning.as_str(), "o3-mini");
        assert_eq!(settings.limits.max_rounds, Some(10));
        assert_eq!(settings.limits.max_steps, 3);
        assert_eq!(settings.limits.scout_max_steps, 30);
        assert_eq!(settings.models.scout.as_str(), "gpt-4o");
        assert_eq!(settings.language, Language::En);
    }

    #[test]
    fn environment_overrides_file_values() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_OPENAI_API_KEY, "sk-fallback"),
            (ENV_SEARCH_TOKEN, "tok"),
            (ENV_DB, "/tmp/atypica-test.db"),
            (ENV_API_BASE_URL, "  "),
        ]);
        let mut settings = Settings::parse("[api]\nbase_url = \"https://proxy.local/v1\"").unwrap();

        settings.apply_overrides(|key| env.get(key).map(|v| v.to_string()));

        assert_eq!(settings.api.api_key.as_deref(), Some("sk-fallback"));
        assert_eq!(settings.api.base_url.as_deref(), Some("https://proxy.local/v1"));
        assert_eq!(settings.search.token.as_deref(), Some("tok"));
        assert_eq!(
            settings.database_path().unwrap(),
            PathBuf::from("/tmp/atypica-test.db")
        );
    }

    #[test]
    fn atypica_key_wins_over_openai_key() {
        let env: HashMap<&str, &str> =
            HashMap::from([(ENV_API_KEY, "sk-primary"), (ENV_OPENAI_API_KEY, "sk-fallback")]);
        let mut settings = Settings::default();
        settings.apply_overrides(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(settings.api.api_key.as_deref(), Some("sk-primary"));
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut settings = Settings::default();
        settings.api.api_key = Some("sk-secret".to_string());
        let rendered = toml::to_string_pretty(&settings).unwrap();
        assert!(!rendered.contains("sk-secret"));
    }
}
