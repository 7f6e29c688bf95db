use async_trait::async_trait;

use crate::tools::capability::Capabilities;
use crate::tools::static_tool::{StaticTool, StaticToolContext, StaticToolError};
use atypica_tools::error::ToolExecutionError;
use atypica_tools::result::UserNotesResult;
use atypica_tools::tools::user_notes::{UserNotesParams, UserNotesToolSpec};

const DESCRIPTION: &str = r#"List the notes one author has published.
- Use it on authors found through content_search to see whether they are a real, consistent user worth a persona
- user_id is the author id from a search result"#;

pub struct UserNotesTool;

#[async_trait]
impl StaticTool for UserNotesTool {
    type Params = UserNotesParams;
    type Output = UserNotesResult;
    type Spec = UserNotesToolSpec;

    const DESCRIPTION: &'static str = DESCRIPTION;
    const REQUIRED_CAPABILITIES: Capabilities = Capabilities::NETWORK;

    async fn execute(
        &self,
        params: Self::Params,
        ctx: &StaticToolContext,
    ) -> Result<Self::Output, StaticToolError> {
        let backend = ctx
            .services
            .content_search()
            .ok_or_else(|| StaticToolError::missing_capability("network"))?;

        let notes = tokio::select! {
            biased;
            () = ctx.cancel_token().cancelled() => return Err(StaticToolError::Cancelled),
            result = backend.user_notes(&params.user_id) => result,
        }
        .map_err(|e| StaticToolError::execution(ToolExecutionError::UserNotes(e)))?;

        Ok(UserNotesResult {
            user_id: params.user_id,
            notes,
        })
    }
}
