pub mod batch;
pub mod engine;
pub mod prompts;
pub mod termination;
pub mod watchdog;

pub use batch::{BatchCoordinator, InterviewResult, PersonaRef};
pub use engine::{DialogueEngine, DialogueError, DialogueOutcome, RunReport};
pub use prompts::Language;
pub use termination::TerminationDetector;
pub use watchdog::Watchdog;
