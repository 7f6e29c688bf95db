pub mod content_search;
pub mod reasoning;
pub mod save_conclusion;
pub mod save_persona;
pub mod user_notes;

pub use content_search::CONTENT_SEARCH_TOOL_NAME;
pub use reasoning::REASONING_THINKING_TOOL_NAME;
pub use save_conclusion::SAVE_INTERVIEW_CONCLUSION_TOOL_NAME;
pub use save_persona::SAVE_PERSONA_TOOL_NAME;
pub use user_notes::USER_NOTES_TOOL_NAME;
