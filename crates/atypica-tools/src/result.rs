use serde::{Deserialize, Serialize};

use crate::error::ToolError;

/// Core enum for all tool results
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum ToolResult {
    Reasoning(ReasoningResult),
    Conclusion(SaveConclusionResult),
    ContentSearch(ContentSearchResult),
    UserNotes(UserNotesResult),
    SavePersona(SavePersonaResult),

    // Failure (any tool)
    Error(ToolError),
}

/// Result for the reasoning_thinking tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReasoningResult {
    pub question: String,
    pub answer: String,
}

/// Result for the save_interview_conclusion tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveConclusionResult {
    pub session_id: i64,
    pub conclusion_chars: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteAuthor {
    pub nickname: String,
    pub user_id: String,
}

/// One social note returned by the content search backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NoteSummary {
    pub id: String,
    pub title: String,
    pub desc: String,
    pub liked_count: u64,
    pub collected_count: u64,
    pub comments_count: u64,
    pub author: NoteAuthor,
}

/// Result for the content_search tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContentSearchResult {
    pub keyword: String,
    pub notes: Vec<NoteSummary>,
}

impl ContentSearchResult {
    pub fn total(&self) -> usize {
        self.notes.len()
    }
}

/// Result for the user_notes tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserNotesResult {
    pub user_id: String,
    pub notes: Vec<NoteSummary>,
}

/// Result for the save_persona tool
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavePersonaResult {
    pub persona_id: i64,
    pub name: String,
    pub tags: Vec<String>,
}

// Trait for typed tool outputs
pub trait ToolOutput: Serialize + Send + Sync + 'static {}

impl ToolOutput for ReasoningResult {}
impl ToolOutput for SaveConclusionResult {}
impl ToolOutput for ContentSearchResult {}
impl ToolOutput for UserNotesResult {}
impl ToolOutput for SavePersonaResult {}
impl ToolOutput for ToolResult {}

impl From<ReasoningResult> for ToolResult {
    fn from(r: ReasoningResult) -> Self {
        Self::Reasoning(r)
    }
}

impl From<SaveConclusionResult> for ToolResult {
    fn from(r: SaveConclusionResult) -> Self {
        Self::Conclusion(r)
    }
}

impl From<ContentSearchResult> for ToolResult {
    fn from(r: ContentSearchResult) -> Self {
        Self::ContentSearch(r)
    }
}

impl From<UserNotesResult> for ToolResult {
    fn from(r: UserNotesResult) -> Self {
        Self::UserNotes(r)
    }
}

impl From<SavePersonaResult> for ToolResult {
    fn from(r: SavePersonaResult) -> Self {
        Self::SavePersona(r)
    }
}

impl From<ToolError> for ToolResult {
    fn from(e: ToolError) -> Self {
        Self::Error(e)
    }
}

impl ToolResult {
    /// Format the result for LLM consumption
    pub fn llm_format(&self) -> String {
        match self {
            ToolResult::Reasoning(r) => r.answer.clone(),
            ToolResult::Conclusion(r) => format!(
                "Interview conclusion saved for session {} ({} characters).",
                r.session_id, r.conclusion_chars
            ),
            ToolResult::ContentSearch(r) => {
                if r.notes.is_empty() {
                    format!("No notes found for \"{}\".", r.keyword)
                } else {
                    let payload = serde_json::json!({
                        "keyword": r.keyword,
                        "total": r.total(),
                        "notes": r.notes,
                    });
                    payload.to_string()
                }
            }
            ToolResult::UserNotes(r) => {
                if r.notes.is_empty() {
                    format!("User {} has no notes.", r.user_id)
                } else {
                    serde_json::json!({ "user_id": r.user_id, "notes": r.notes }).to_string()
                }
            }
            ToolResult::SavePersona(r) => serde_json::json!({
                "persona_id": r.persona_id,
                "name": r.name,
                "tags": r.tags,
            })
            .to_string(),
            ToolResult::Error(e) => format!("Error: {e}"),
        }
    }

    /// Get the variant name as a string for metadata
    pub fn variant_name(&self) -> &'static str {
        match self {
            ToolResult::Reasoning(_) => "Reasoning",
            ToolResult::Conclusion(_) => "Conclusion",
            ToolResult::ContentSearch(_) => "ContentSearch",
            ToolResult::UserNotes(_) => "UserNotes",
            ToolResult::SavePersona(_) => "SavePersona",
            ToolResult::Error(_) => "Error",
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, ToolResult::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn note(id: &str, title: &str) -> NoteSummary {
        NoteSummary {
            id: id.to_string(),
            title: title.to_string(),
            desc: "desc".to_string(),
            liked_count: 12,
            collected_count: 3,
            comments_count: 1,
            author: NoteAuthor {
                nickname: "lin".to_string(),
                user_id: "u1".to_string(),
            },
        }
    }

    #[test]
    fn empty_search_mentions_keyword() {
        let result: ToolResult = ContentSearchResult {
            keyword: "sunscreen".to_string(),
            notes: vec![],
        }
        .into();
        assert_eq!(result.llm_format(), "No notes found for \"sunscreen\".");
    }

    #[test]
    fn search_results_are_compact_json() {
        let result: ToolResult = ContentSearchResult {
            keyword: "sunscreen".to_string(),
            notes: vec![note("n1", "first"), note("n2", "second")],
        }
        .into();

        let parsed: serde_json::Value =
            serde_json::from_str(&result.llm_format()).unwrap_or_default();
        assert_eq!(parsed["total"], 2);
        assert_eq!(parsed["notes"][1]["title"], "second");
        assert_eq!(parsed["notes"][0]["author"]["nickname"], "lin");
    }

    #[test]
    fn saved_persona_is_echoed_back() {
        let result: ToolResult = SavePersonaResult {
            persona_id: 4,
            name: "Lin".to_string(),
            tags: vec!["office worker".to_string()],
        }
        .into();

        let parsed: serde_json::Value =
            serde_json::from_str(&result.llm_format()).unwrap_or_default();
        assert_eq!(parsed["persona_id"], 4);
        assert_eq!(parsed["tags"][0], "office worker");
    }

    #[test]
    fn user_without_notes_is_stated_plainly() {
        let result: ToolResult = UserNotesResult {
            user_id: "u9".to_string(),
            notes: vec![],
        }
        .into();
        assert_eq!(result.llm_format(), "User u9 has no notes.");
        assert_eq!(result.variant_name(), "UserNotes");
    }

    #[test]
    fn errors_are_prefixed() {
        let result: ToolResult = ToolError::UnknownTool("nope".to_string()).into();
        assert!(result.is_error());
        assert_eq!(result.llm_format(), "Error: Unknown tool: nope");
        assert_eq!(result.variant_name(), "Error");
    }
}
