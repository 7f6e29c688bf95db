use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::ToolSpec;
use crate::error::ToolExecutionError;
use crate::result::ContentSearchResult;

pub const CONTENT_SEARCH_TOOL_NAME: &str = "content_search";

pub struct ContentSearchToolSpec;

impl ToolSpec for ContentSearchToolSpec {
    type Params = ContentSearchParams;
    type Result = ContentSearchResult;
    type Error = ContentSearchError;

    const NAME: &'static str = CONTENT_SEARCH_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "Search Notes";

    fn execution_error(error: Self::Error) -> ToolExecutionError {
        ToolExecutionError::ContentSearch(error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema, Error)]
#[serde(tag = "code", rename_all = "snake_case")]
pub enum ContentSearchError {
    #[error("request failed: {message}")]
    RequestFailed { message: String },

    #[error("http error: {status}")]
    Http { status: u16 },

    #[error("unexpected response: {message}")]
    InvalidResponse { message: String },
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ContentSearchParams {
    /// Keyword to search social notes for
    pub keyword: String,
}
