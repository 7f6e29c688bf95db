use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ToolSpec;
use crate::error::ToolExecutionError;
use crate::result::UserNotesResult;
use crate::tools::content_search::ContentSearchError;

pub const USER_NOTES_TOOL_NAME: &str = "user_notes";

/// Shares the search backend, and with it the backend's error type.
pub struct UserNotesToolSpec;

impl ToolSpec for UserNotesToolSpec {
    type Params = UserNotesParams;
    type Result = UserNotesResult;
    type Error = ContentSearchError;

    const NAME: &'static str = USER_NOTES_TOOL_NAME;
    const DISPLAY_NAME: &'static str = "User Notes";

    fn execution_error(error: Self::Error) -> ToolExecutionError {
        ToolExecutionError::UserNotes(error)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct UserNotesParams {
    /// Author id as it appears in search results (`author.user_id`)
    pub user_id: String,
}
