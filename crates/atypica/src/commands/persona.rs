use async_trait::async_trait;
use eyre::{Result, eyre};
use std::io::Write;

use super::Command;
use super::topic::truncate;
use crate::cli::PersonaCommands;
use crate::open_store;
use atypica_core::config::Settings;
use atypica_core::store::{InterviewStore, NewPersona};

pub struct PersonaCommand {
    pub command: PersonaCommands,
    pub settings: Settings,
}

#[async_trait]
impl Command for PersonaCommand {
    async fn execute(&self) -> Result<()> {
        let store = open_store(&self.settings).await?;
        let mut stdout = std::io::stdout();

        match &self.command {
            PersonaCommands::Create {
                name,
                tags,
                prompt_file,
            } => {
                let prompt = tokio::fs::read_to_string(prompt_file).await.map_err(|e| {
                    eyre!("Failed to read prompt file {}: {}", prompt_file.display(), e)
                })?;
                if prompt.trim().is_empty() {
                    eyre::bail!("Prompt file {} is empty", prompt_file.display());
                }

                let persona = store
                    .create_persona(NewPersona {
                        name: name.clone(),
                        tags: tags.clone(),
                        prompt: prompt.trim().to_string(),
                        scout_run_id: None,
                    })
                    .await
                    .map_err(|e| eyre!("Failed to create persona: {}", e))?;
                writeln!(stdout, "Created persona: {}", persona.id)?;
            }
            PersonaCommands::List => {
                let personas = store
                    .list_personas()
                    .await
                    .map_err(|e| eyre!("Failed to list personas: {}", e))?;
                if personas.is_empty() {
                    writeln!(stdout, "No personas found.")?;
                    return Ok(());
                }

                writeln!(stdout, "{:<8} {:<20} {:<30} {:<50}", "ID", "Name", "Tags", "Prompt")?;
                writeln!(stdout, "{}", "-".repeat(111))?;
                for persona in personas {
                    writeln!(
                        stdout,
                        "{:<8} {:<20} {:<30} {:<50}",
                        persona.id,
                        truncate(&persona.name, 20),
                        truncate(&persona.tags.join(", "), 30),
                        truncate(&persona.prompt, 50),
                    )?;
                }
            }
        }

        Ok(())
    }
}
