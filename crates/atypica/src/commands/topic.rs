use async_trait::async_trait;
use chrono::Local;
use eyre::{Result, eyre};
use std::io::Write;

use super::Command;
use crate::cli::TopicCommands;
use crate::open_store;
use atypica_core::config::Settings;
use atypica_core::store::{InterviewStore, NewTopic, TopicId, TopicUpdate};

pub struct TopicCommand {
    pub command: TopicCommands,
    pub settings: Settings,
}

#[async_trait]
impl Command for TopicCommand {
    async fn execute(&self) -> Result<()> {
        let store = open_store(&self.settings).await?;
        let mut stdout = std::io::stdout();

        match &self.command {
            TopicCommands::Create { role, topic } => {
                let topic = store
                    .create_topic(NewTopic {
                        role: role.clone(),
                        topic: topic.clone(),
                    })
                    .await
                    .map_err(|e| eyre!("Failed to create topic: {}", e))?;
                writeln!(stdout, "Created topic: {}", topic.id)?;
            }
            TopicCommands::List { limit } => {
                let topics = store
                    .list_topics(*limit)
                    .await
                    .map_err(|e| eyre!("Failed to list topics: {}", e))?;
                if topics.is_empty() {
                    writeln!(stdout, "No topics found.")?;
                    return Ok(());
                }

                writeln!(stdout, "{:<8} {:<20} {:<24} {:<60}", "ID", "Created", "Role", "Topic")?;
                writeln!(stdout, "{}", "-".repeat(112))?;
                for topic in topics {
                    writeln!(
                        stdout,
                        "{:<8} {:<20} {:<24} {:<60}",
                        topic.id,
                        topic.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S"),
                        truncate(&topic.role, 24),
                        truncate(&topic.topic, 60),
                    )?;
                }
            }
            TopicCommands::Show { id } => {
                let topic_id = TopicId(*id);
                let topic = store
                    .get_topic(topic_id)
                    .await
                    .map_err(|e| eyre!("Failed to get topic: {}", e))?;
                let sessions = store
                    .list_sessions_for_topic(topic_id)
                    .await
                    .map_err(|e| eyre!("Failed to list sessions: {}", e))?;

                writeln!(stdout, "Topic Details:")?;
                writeln!(stdout, "ID: {}", topic.id)?;
                writeln!(stdout, "Role: {}", topic.role)?;
                writeln!(
                    stdout,
                    "Created: {}",
                    topic.created_at.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
                )?;
                writeln!(stdout, "Topic:\n{}", topic.topic)?;
                if !topic.report.is_empty() {
                    writeln!(stdout, "Report:\n{}", topic.report)?;
                }
                if let Some(summary) = &topic.study_summary {
                    writeln!(stdout, "Study summary:\n{summary}")?;
                }
                writeln!(stdout, "Sessions: {}", sessions.len())?;
                for session in sessions {
                    let state = if session.is_leased() {
                        "running"
                    } else if session.is_concluded() {
                        "concluded"
                    } else {
                        "open"
                    };
                    writeln!(
                        stdout,
                        "  persona {:<8} {:<10} {} messages",
                        session.persona_id,
                        state,
                        session.messages.len()
                    )?;
                }
            }
            TopicCommands::Update {
                id,
                role,
                topic,
                report_file,
                summary,
            } => {
                let report = match report_file {
                    Some(path) => Some(tokio::fs::read_to_string(path).await.map_err(|e| {
                        eyre!("Failed to read report file {}: {}", path.display(), e)
                    })?),
                    None => None,
                };
                if role.is_none() && topic.is_none() && report.is_none() && summary.is_none() {
                    eyre::bail!("Nothing to update; pass --role, --topic, --report-file or --summary");
                }

                let topic_id = TopicId(*id);
                store
                    .update_topic(
                        topic_id,
                        TopicUpdate {
                            role: role.clone(),
                            topic: topic.clone(),
                            report,
                        },
                    )
                    .await
                    .map_err(|e| eyre!("Failed to update topic: {}", e))?;
                if let Some(summary) = summary {
                    store
                        .save_study_summary(topic_id, summary)
                        .await
                        .map_err(|e| eyre!("Failed to save study summary: {}", e))?;
                }
                writeln!(stdout, "Updated topic: {}", topic_id)?;
            }
        }

        Ok(())
    }
}

/// Cut `text` to at most `width` characters for column output.
pub(crate) fn truncate(text: &str, width: usize) -> String {
    let flat = text.replace('\n', " ");
    if flat.chars().count() <= width {
        return flat;
    }
    let mut cut: String = flat.chars().take(width.saturating_sub(3)).collect();
    cut.push_str("...");
    cut
}
