use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Bounds applied to agent runs and interview batches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DialogueLimits {
    /// Wall-clock ceiling for one interview.
    pub timeout_secs: u64,
    /// How often the watchdog samples elapsed time.
    pub tick_secs: u64,
    /// Grace period after a batch settles.
    pub settle_secs: u64,
    /// Generation steps per agent turn.
    pub max_steps: usize,
    /// Generation steps per scouting request. Scouts search, read and save
    /// many times within one reply.
    pub scout_max_steps: usize,
    pub max_rounds: Option<usize>,
    pub max_personas: usize,
}

impl Default for DialogueLimits {
    fn default() -> Self {
        Self {
            timeout_secs: 600,
            tick_secs: 5,
            settle_secs: 5,
            max_steps: 3,
            scout_max_steps: 30,
            max_rounds: Some(40),
            max_personas: 5,
        }
    }
}

impl DialogueLimits {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn tick(&self) -> Duration {
        // A zero interval would make the watchdog spin.
        Duration::from_secs(self.tick_secs.max(1))
    }

    pub fn settle(&self) -> Duration {
        Duration::from_secs(self.settle_secs)
    }
}
