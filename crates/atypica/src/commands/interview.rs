use async_trait::async_trait;
use eyre::Result;
use std::io::Write;

use super::{Command, cancel_on_interrupt};
use crate::InterviewRuntime;
use atypica_core::config::Settings;
use atypica_core::interview::PersonaRef;
use atypica_core::store::TopicId;

pub struct InterviewCommand {
    pub topic_id: TopicId,
    pub personas: Vec<PersonaRef>,
    pub settings: Settings,
}

#[async_trait]
impl Command for InterviewCommand {
    async fn execute(&self) -> Result<()> {
        let runtime = InterviewRuntime::build(&self.settings).await?;

        let (cancel, interrupt) = cancel_on_interrupt();

        let results = runtime
            .coordinator
            .run_batch(self.topic_id, &self.personas, cancel)
            .await;
        interrupt.abort();

        let mut stdout = std::io::stdout();
        writeln!(stdout, "{}", serde_json::to_string_pretty(&results?)?)?;
        Ok(())
    }
}
