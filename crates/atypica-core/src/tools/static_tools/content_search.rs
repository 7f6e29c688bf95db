use async_trait::async_trait;

use crate::tools::capability::Capabilities;
use crate::tools::static_tool::{StaticTool, StaticToolContext, StaticToolError};
use atypica_tools::error::ToolExecutionError;
use atypica_tools::result::ContentSearchResult;
use atypica_tools::tools::content_search::{ContentSearchParams, ContentSearchToolSpec};

const DESCRIPTION: &str = r#"Search social notes for a keyword.
- Personas: recall how people like you talk about a product, habit or situation before answering
- Scouts: find real users discussing the brand, its topic or its competitors
- Returns up to one page of notes with title, text, engagement counts and author"#;

pub struct ContentSearchTool;

#[async_trait]
impl StaticTool for ContentSearchTool {
    type Params = ContentSearchParams;
    type Output = ContentSearchResult;
    type Spec = ContentSearchToolSpec;

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
            result = backend.search(&params.keyword) => result,
        }
        .map_err(|e| StaticToolError::execution(ToolExecutionError::ContentSearch(e)))?;

        Ok(ContentSearchResult {
            keyword: params.keyword,
            notes,
        })
    }
}
