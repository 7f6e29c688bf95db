use async_trait::async_trait;
use chrono::Local;
use eyre::{Result, eyre};
use std::io::Write;

use super::topic::truncate;
use super::{Command, cancel_on_interrupt};
use crate::cli::ScoutCommands;
use crate::{InterviewRuntime, open_store};
use atypica_core::config::Settings;
use atypica_core::conversation::Role;
use atypica_core::scout::ScoutReport;
use atypica_core::store::{InterviewStore, Persona, ScoutRunId};

pub struct ScoutCommand {
    pub command: ScoutCommands,
    pub settings: Settings,
}

#[async_trait]
impl Command for ScoutCommand {
    async fn execute(&self) -> Result<()> {
        let mut stdout = std::io::stdout();

        match &self.command {
            ScoutCommands::Start { description } => {
                let runtime = InterviewRuntime::build(&self.settings).await?;
                let (cancel, interrupt) = cancel_on_interrupt();
                let report = runtime.scout.start(description, cancel).await;
                interrupt.abort();
                let report = report.map_err(|e| eyre!("Scouting failed: {}", e))?;
                write_report(&mut stdout, &report)?;
            }
            ScoutCommands::Continue { run, request } => {
                let runtime = InterviewRuntime::build(&self.settings).await?;
                let (cancel, interrupt) = cancel_on_interrupt();
                let report = runtime
                    .scout
                    .follow_up(ScoutRunId(*run), request, cancel)
                    .await;
                interrupt.abort();
                let report = report.map_err(|e| eyre!("Scouting failed: {}", e))?;
                write_report(&mut stdout, &report)?;
            }
            ScoutCommands::Show { run } => {
                let store = open_store(&self.settings).await?;
                let run = store
                    .get_scout_run(ScoutRunId(*run))
                    .await
                    .map_err(|e| eyre!("Failed to load scout run: {}", e))?;
                let personas = store
                    .list_personas_for_scout_run(run.id)
                    .await
                    .map_err(|e| eyre!("Failed to list personas: {}", e))?;

                writeln!(stdout, "Scout run {}: {}", run.id, run.description)?;
                writeln!(
                    stdout,
                    "Updated: {}",
                    run.updated_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                )?;
                writeln!(stdout)?;
                for message in &run.messages {
                    let speaker = match message.role {
                        Role::User => "You",
                        Role::Assistant => "Scout",
                    };
                    writeln!(stdout, "[{speaker}] {}", message.content)?;
                    for (call, result) in message.tool_invocations() {
                        let marker = if result.is_error { "failed" } else { "ok" };
                        writeln!(stdout, "    ({} {marker})", call.name)?;
                    }
                }
                writeln!(stdout)?;
                write_personas(&mut stdout, &personas)?;
            }
        }

        Ok(())
    }
}

fn write_report(out: &mut impl Write, report: &ScoutReport) -> Result<()> {
    writeln!(out, "Scout run {} ({} steps)", report.scout_run_id, report.steps)?;
    writeln!(out)?;
    writeln!(out, "{}", report.reply)?;
    writeln!(out)?;
    write_personas(out, &report.personas)
}

pub(crate) fn write_personas(out: &mut impl Write, personas: &[Persona]) -> Result<()> {
    if personas.is_empty() {
        writeln!(out, "No personas saved yet.")?;
        return Ok(());
    }
    writeln!(out, "Personas saved by this run:")?;
    writeln!(out, "{:<8} {:<20} {:<30}", "ID", "Name", "Tags")?;
    writeln!(out, "{}", "-".repeat(60))?;
    for persona in personas {
        writeln!(
            out,
            "{:<8} {:<20} {:<30}",
            persona.id,
            truncate(&persona.name, 20),
            truncate(&persona.tags.join(", "), 30),
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use atypica_core::store::PersonaId;
    use chrono::Utc;

    #[test]
    fn personas_are_listed_with_their_tags() {
        let personas = vec![Persona {
            id: PersonaId(4),
            name: "早八通勤族".to_string(),
            tags: vec!["白领".to_string(), "25-30岁".to_string()],
            prompt: "你是…".to_string(),
            scout_run_id: Some(ScoutRunId(1)),
            created_at: Utc::now(),
        }];
        let mut out = Vec::new();
        write_personas(&mut out, &personas).unwrap();
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("早八通勤族"));
        assert!(text.contains("白领, 25-30岁"));

        let mut out = Vec::new();
        write_personas(&mut out, &[]).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No personas saved yet.\n");
    }
}
