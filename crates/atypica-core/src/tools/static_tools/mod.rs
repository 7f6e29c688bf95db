pub mod content_search;
pub mod reasoning;
pub mod save_conclusion;
pub mod save_persona;
pub mod user_notes;

pub use content_search::ContentSearchTool;
pub use reasoning::ReasoningThinkingTool;
pub use save_conclusion::SaveInterviewConclusionTool;
pub use save_persona::SavePersonaTool;
pub use user_notes::UserNotesTool;
