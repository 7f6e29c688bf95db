use async_trait::async_trait;
use eyre::{Result, eyre};
use std::io::Write;

use super::Command;
use crate::cli::SessionCommands;
use crate::open_store;
use atypica_core::config::Settings;
use atypica_core::conversation::Role;
use atypica_core::store::{InterviewStore, PersonaId, TopicId};

pub struct SessionCommand {
    pub command: SessionCommands,
    pub settings: Settings,
}

#[async_trait]
impl Command for SessionCommand {
    async fn execute(&self) -> Result<()> {
        let store = open_store(&self.settings).await?;
        let mut stdout = std::io::stdout();

        match &self.command {
            SessionCommands::Show { topic, persona } => {
                let session = store
                    .find_session(TopicId(*topic), PersonaId(*persona))
                    .await
                    .map_err(|e| eyre!("Failed to load session: {}", e))?
                    .ok_or_else(|| {
                        eyre!("No session for topic {} and persona {}", topic, persona)
                    })?;

                writeln!(stdout, "Session {} ({} messages)", session.id, session.messages.len())?;
                if session.is_leased() {
                    writeln!(stdout, "A run currently holds this session.")?;
                }
                writeln!(stdout)?;

                // Stored transcripts are the persona's view.
                for message in &session.messages {
                    let speaker = match message.role {
                        Role::User => "Interviewer",
                        Role::Assistant => "Persona",
                    };
                    writeln!(stdout, "[{speaker}] {}", message.content)?;
                    for (call, result) in message.tool_invocations() {
                        let marker = if result.is_error { "failed" } else { "ok" };
                        writeln!(stdout, "    ({} {marker})", call.name)?;
                    }
                }

                if session.is_concluded() {
                    writeln!(stdout, "\nConclusion:\n{}", session.conclusion)?;
                    writeln!(stdout, "\nPersona summary:\n{}", session.persona_summary)?;
                    writeln!(stdout, "\nHighlights:\n{}", session.highlights)?;
                }
            }
        }

        Ok(())
    }
}
