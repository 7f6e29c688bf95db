use async_trait::async_trait;
use tracing::info;

use crate::store::NewPersona;
use crate::tools::capability::Capabilities;
use crate::tools::static_tool::{StaticTool, StaticToolContext, StaticToolError};
use atypica_tools::error::ToolExecutionError;
use atypica_tools::result::SavePersonaResult;
use atypica_tools::tools::save_persona::{
    SavePersonaError, SavePersonaParams, SavePersonaToolSpec,
};

const DESCRIPTION: &str = r#"Save one persona distilled from the users you studied. Call once per persona.
- name: short display name
- tags: keywords such as age group, occupation and interests
- prompt: role-play prompt in the second person covering background, habits, way of speaking and values"#;

pub struct SavePersonaTool;

fn rejected(error: SavePersonaError) -> StaticToolError {
    StaticToolError::execution(ToolExecutionError::SavePersona(error))
}

#[async_trait]
impl StaticTool for SavePersonaTool {
    type Params = SavePersonaParams;
    type Output = SavePersonaResult;
    type Spec = SavePersonaToolSpec;

    const DESCRIPTION: &'static str = DESCRIPTION;
    const REQUIRED_CAPABILITIES: Capabilities = Capabilities::STORE;

    async fn execute(
        &self,
        params: Self::Params,
        ctx: &StaticToolContext,
    ) -> Result<Self::Output, StaticToolError> {
        let scout_run_id = ctx
            .run
            .scout_run_id()
            .ok_or_else(|| rejected(SavePersonaError::NotScouting))?;

        let name = params.name.trim();
        if name.is_empty() {
            return Err(rejected(SavePersonaError::Empty {
                field: "name".to_string(),
            }));
        }
        if params.prompt.trim().is_empty() {
            return Err(rejected(SavePersonaError::Empty {
                field: "prompt".to_string(),
            }));
        }
        let tags: Vec<String> = params
            .tags
            .iter()
            .map(|tag| tag.trim())
            .filter(|tag| !tag.is_empty())
            .map(str::to_string)
            .collect();

        let persona = ctx
            .services
            .store
            .create_persona(NewPersona {
                name: name.to_string(),
                tags,
                prompt: params.prompt,
                scout_run_id: Some(scout_run_id),
            })
            .await
            .map_err(|e| {
                rejected(SavePersonaError::StoreFailed {
                    message: e.to_string(),
                })
            })?;

        info!(
            target: "tools::save_persona",
            %scout_run_id,
            persona_id = %persona.id,
            "Persona saved"
        );

        Ok(SavePersonaResult {
            persona_id: persona.id.0,
            name: persona.name,
            tags: persona.tags,
        })
    }
}
