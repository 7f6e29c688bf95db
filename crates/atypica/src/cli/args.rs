use clap::{Parser, Subcommand};
use std::path::PathBuf;

use atypica_core::interview::PersonaRef;
use atypica_core::store::PersonaId;

/// Simulated user interviews: an interviewer agent talks to persona agents
/// about a research topic.
#[derive(Parser)]
#[command(version, about, long_about = None, author)]
pub struct Cli {
    /// Path to the SQLite database (defaults to the user data directory)
    #[arg(long, env = "ATYPICA_DB", global = true)]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Clone)]
pub enum Commands {
    /// Manage research topics
    Topic {
        #[command(subcommand)]
        action: TopicCommands,
    },
    /// Manage personas
    Persona {
        #[command(subcommand)]
        action: PersonaCommands,
    },
    /// Interview up to five personas about a topic and print the outcomes as JSON
    Interview {
        /// Topic to interview about
        #[arg(long)]
        topic: i64,
        /// Persona to interview, as ID:NAME (repeatable)
        #[arg(long = "persona", value_name = "ID:NAME", required = true, value_parser = parse_persona_ref)]
        personas: Vec<PersonaRef>,
    },
    /// Inspect interview sessions
    Session {
        #[command(subcommand)]
        action: SessionCommands,
    },
    /// Find real users through note search and save them as personas
    Scout {
        #[command(subcommand)]
        action: ScoutCommands,
    },
}

#[derive(Subcommand, Clone)]
pub enum TopicCommands {
    /// Create a topic
    Create {
        /// Who the interviewer introduces themselves as
        #[arg(long)]
        role: String,
        /// What the interview is about
        #[arg(long)]
        topic: String,
    },
    /// List recent topics
    List {
        #[arg(long, default_value_t = 20)]
        limit: usize,
    },
    /// Show a topic and its sessions
    Show { id: i64 },
    /// Change a topic's brief or attach its report and study summary
    Update {
        id: i64,
        #[arg(long)]
        role: Option<String>,
        #[arg(long)]
        topic: Option<String>,
        /// File holding the topic's report
        #[arg(long)]
        report_file: Option<PathBuf>,
        #[arg(long)]
        summary: Option<String>,
    },
}

#[derive(Subcommand, Clone)]
pub enum PersonaCommands {
    /// Create a persona from a prompt file
    Create {
        #[arg(long)]
        name: String,
        /// Tag (repeatable)
        #[arg(long = "tag")]
        tags: Vec<String>,
        /// File holding the persona's behavioral prompt
        #[arg(long)]
        prompt_file: PathBuf,
    },
    /// List personas
    List,
}

#[derive(Subcommand, Clone)]
pub enum SessionCommands {
    /// Print the transcript of a topic/persona session
    Show {
        #[arg(long)]
        topic: i64,
        #[arg(long)]
        persona: i64,
    },
}

#[derive(Subcommand, Clone)]
pub enum ScoutCommands {
    /// Start a scouting run, e.g. "帮我寻找燕麦拿铁的用户"
    Start { description: String },
    /// Send a further request to an existing run
    Continue { run: i64, request: String },
    /// Show a run's conversation and the personas it saved
    Show { run: i64 },
}

fn parse_persona_ref(value: &str) -> Result<PersonaRef, String> {
    let (id, name) = value
        .split_once(':')
        .ok_or_else(|| format!("expected ID:NAME, got '{value}'"))?;
    let id: i64 = id
        .trim()
        .parse()
        .map_err(|_| format!("invalid persona id '{id}'"))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing persona name in '{value}'"));
    }
    Ok(PersonaRef::new(PersonaId(id), name))
}
