use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use atypica_tools::result::{NoteAuthor, NoteSummary};
use atypica_tools::tools::content_search::ContentSearchError;

use super::services::ContentSearch;

const SEARCH_PATH: &str = "search-note/v2";
const USER_NOTES_PATH: &str = "get-user-note-list/v1";
const NOTE_MODEL_TYPE: &str = "note";

/// Note search over the third-party social content API.
pub struct HttpContentSearch {
    http_client: reqwest::Client,
    base_url: String,
    token: String,
}

impl HttpContentSearch {
    pub fn new(base_url: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token: token.into(),
        }
    }

    /// GET `path` with the API token prepended to `query`; returns the body.
    async fn get(&self, path: &str, query: &[(&str, &str)]) -> Result<String, ContentSearchError> {
        let url = format!("{}/{path}", self.base_url);
        let response = self
            .http_client
            .get(&url)
            .query(&[("token", self.token.as_str())])
            .query(query)
            .send()
            .await
            .map_err(|e| ContentSearchError::RequestFailed {
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ContentSearchError::Http {
                status: status.as_u16(),
            });
        }

        response
            .text()
            .await
            .map_err(|e| ContentSearchError::RequestFailed {
                message: e.to_string(),
            })
    }
}

#[async_trait]
impl ContentSearch for HttpContentSearch {
    async fn search(&self, keyword: &str) -> Result<Vec<NoteSummary>, ContentSearchError> {
        let body = self
            .get(
                SEARCH_PATH,
                &[
                    ("keyword", keyword),
                    ("page", "1"),
                    ("sort", "general"),
                    ("noteType", "_0"),
                ],
            )
            .await?;

        let notes = parse_search_response(&body)?;
        debug!(target: "tools::content_search", keyword, count = notes.len(), "search finished");
        Ok(notes)
    }

    async fn user_notes(&self, user_id: &str) -> Result<Vec<NoteSummary>, ContentSearchError> {
        let body = self.get(USER_NOTES_PATH, &[("userId", user_id)]).await?;

        let notes = parse_user_notes_response(&body)?;
        debug!(target: "tools::content_search", user_id, count = notes.len(), "user notes fetched");
        Ok(notes)
    }
}

#[derive(Debug, Deserialize)]
struct SearchEnvelope {
    data: SearchData,
}

#[derive(Debug, Deserialize)]
struct SearchData {
    #[serde(default)]
    items: Vec<SearchItem>,
}

#[derive(Debug, Deserialize)]
struct SearchItem {
    model_type: String,
    #[serde(default)]
    note: Option<RawNote>,
}

#[derive(Debug, Deserialize)]
struct UserNotesEnvelope {
    data: UserNotesData,
}

#[derive(Debug, Deserialize)]
struct UserNotesData {
    #[serde(default)]
    notes: Vec<RawNote>,
}

#[derive(Debug, Deserialize)]
struct RawNote {
    id: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    desc: String,
    /// The user-note listing calls this `nice_count`.
    #[serde(default, alias = "nice_count")]
    liked_count: u64,
    #[serde(default)]
    collected_count: u64,
    #[serde(default)]
    comments_count: u64,
    user: RawUser,
}

#[derive(Debug, Deserialize)]
struct RawUser {
    #[serde(default)]
    nickname: String,
    #[serde(default)]
    userid: String,
}

impl From<RawNote> for NoteSummary {
    fn from(note: RawNote) -> Self {
        NoteSummary {
            id: note.id,
            title: note.title,
            desc: note.desc,
            liked_count: note.liked_count,
            collected_count: note.collected_count,
            comments_count: note.comments_count,
            author: NoteAuthor {
                nickname: note.user.nickname,
                user_id: note.user.userid,
            },
        }
    }
}

fn decode<T: serde::de::DeserializeOwned>(body: &str) -> Result<T, ContentSearchError> {
    serde_json::from_str(body).map_err(|e| ContentSearchError::InvalidResponse {
        message: e.to_string(),
    })
}

/// Keep only note items; other result kinds (ads, topics, users) are dropped.
pub(crate) fn parse_search_response(body: &str) -> Result<Vec<NoteSummary>, ContentSearchError> {
    let envelope: SearchEnvelope = decode(body)?;

    Ok(envelope
        .data
        .items
        .into_iter()
        .filter(|item| item.model_type == NOTE_MODEL_TYPE)
        .filter_map(|item| item.note)
        .map(NoteSummary::from)
        .collect())
}

pub(crate) fn parse_user_notes_response(
    body: &str,
) -> Result<Vec<NoteSummary>, ContentSearchError> {
    let envelope: UserNotesEnvelope = decode(body)?;
    Ok(envelope.data.notes.into_iter().map(NoteSummary::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_note_items_are_kept() {
        let body = r#"{
            "data": {
                "items": [
                    {"model_type": "note", "note": {
                        "id": "n1", "title": "Morning oat latte", "desc": "so creamy",
                        "type": "normal", "liked_count": 120, "collected_count": 30,
                        "comments_count": 8,
                        "user": {"nickname": "mia", "userid": "u9", "images": "x.jpg"},
                        "images_list": [{"url": "a", "url_size_large": "b", "width": 1, "height": 1}]
                    }},
                    {"model_type": "hot_query", "hot_query": {}},
                    {"model_type": "note", "note": {
                        "id": "n2", "title": "", "desc": "",
                        "user": {"nickname": "", "userid": "u2"}
                    }}
                ]
            }
        }"#;

        let notes = parse_search_response(body).unwrap();
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0].title, "Morning oat latte");
        assert_eq!(notes[0].liked_count, 120);
        assert_eq!(notes[0].author.user_id, "u9");
        assert_eq!(notes[1].comments_count, 0);
    }

    #[test]
    fn user_note_listing_reads_nice_count_as_likes() {
        let body = r#"{
            "data": {
                "notes": [
                    {"id": "n7", "title": "Weekend brunch", "desc": "oat flat white again",
                     "type": "normal", "nice_count": 45, "collected_count": 2,
                     "comments_count": 3,
                     "user": {"nickname": "mia", "userid": "u9", "images": "x.jpg"},
                     "images_list": []}
                ]
            }
        }"#;

        let notes = parse_user_notes_response(body).unwrap();
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].liked_count, 45);
        assert_eq!(notes[0].author.nickname, "mia");

        let empty = parse_user_notes_response(r#"{"data": {}}"#).unwrap();
        assert!(empty.is_empty());
    }

    #[test]
    fn malformed_body_is_an_invalid_response() {
        let err = parse_search_response("{\"code\": 500}").unwrap_err();
        assert!(matches!(err, ContentSearchError::InvalidResponse { .. }));
    }
}
