use clap::Parser;
use eyre::Result;

use atypica::cli::{Cli, Commands};
use atypica::commands::{
    Command, interview::InterviewCommand, persona::PersonaCommand, scout::ScoutCommand,
    session::SessionCommand, topic::TopicCommand,
};
use atypica_core::config::Settings;
use atypica_core::store::TopicId;
use atypica_core::utils::paths::AppPaths;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;

    // Before parsing, so `.env` can supply ATYPICA_DB.
    atypica::cli::config::load_env()?;
    let cli = Cli::parse();

    let _log_guard = atypica_core::utils::tracing::init_tracing(AppPaths::log_dir().as_deref())?;

    let mut settings = Settings::load()?;
    if let Some(db) = cli.db {
        settings.database = Some(db);
    }

    match cli.command {
        Commands::Topic { action } => {
            TopicCommand {
                command: action,
                settings,
            }
            .execute()
            .await
        }
        Commands::Persona { action } => {
            PersonaCommand {
                command: action,
                settings,
            }
            .execute()
            .await
        }
        Commands::Interview { topic, personas } => {
            InterviewCommand {
                topic_id: TopicId(topic),
                personas,
                settings,
            }
            .execute()
            .await
        }
        Commands::Session { action } => {
            SessionCommand {
                command: action,
                settings,
            }
            .execute()
            .await
        }
        Commands::Scout { action } => {
            ScoutCommand {
                command: action,
                settings,
            }
            .execute()
            .await
        }
    }
}
