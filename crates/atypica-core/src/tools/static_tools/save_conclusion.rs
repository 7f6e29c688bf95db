use async_trait::async_trait;

use crate::store::ConclusionRecord;
use crate::tools::capability::Capabilities;
use crate::tools::static_tool::{StaticTool, StaticToolContext, StaticToolError};
use atypica_tools::error::ToolExecutionError;
use atypica_tools::result::SaveConclusionResult;
use atypica_tools::tools::save_conclusion::{
    SaveConclusionError, SaveConclusionParams, SaveInterviewConclusionToolSpec,
};

const DESCRIPTION: &str = r#"Save the conclusion of this interview. Call exactly once, right after the closing line.
- conclusion: assessment of the research question and suggested improvements
- persona_summary: demographics, habits, lifestyle, values and preferences of the interviewee
- highlights: the most revealing dialogue excerpts with the findings they support"#;

pub struct SaveInterviewConclusionTool;

#[async_trait]
impl StaticTool for SaveInterviewConclusionTool {
    type Params = SaveConclusionParams;
    type Output = SaveConclusionResult;
    type Spec = SaveInterviewConclusionToolSpec;

    const DESCRIPTION: &'static str = DESCRIPTION;
    const REQUIRED_CAPABILITIES: Capabilities = Capabilities::STORE;

    async fn execute(
        &self,
        params: Self::Params,
        ctx: &StaticToolContext,
    ) -> Result<Self::Output, StaticToolError> {
        let session_id = ctx.run.session_id().ok_or_else(|| {
            StaticToolError::execution(ToolExecutionError::SaveConclusion(
                SaveConclusionError::NoSession,
            ))
        })?;
        if params.conclusion.trim().is_empty() {
            return Err(StaticToolError::execution(
                ToolExecutionError::SaveConclusion(SaveConclusionError::EmptyConclusion),
            ));
        }

        let conclusion_chars = params.conclusion.chars().count();
        let record = ConclusionRecord {
            conclusion: params.conclusion,
            persona_summary: params.persona_summary,
            highlights: params.highlights,
        };

        // Not lease-checked.
        ctx.services
            .store
            .save_conclusion(session_id, &record)
            .await
            .map_err(|e| {
                StaticToolError::execution(ToolExecutionError::SaveConclusion(
                    SaveConclusionError::StoreFailed {
                        message: e.to_string(),
                    },
                ))
            })?;

        Ok(SaveConclusionResult {
            session_id: session_id.0,
            conclusion_chars,
        })
    }
}
