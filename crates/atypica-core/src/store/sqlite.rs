use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{
    Row,
    sqlite::{
        SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteRow,
        SqliteSynchronous,
    },
};
use std::path::Path;
use std::str::FromStr;
use tracing::warn;

use super::types::{
    ConclusionRecord, LeaseToken, NewPersona, NewTopic, NewUsage, Persona, PersonaId, ScoutRun,
    ScoutRunId, Session, SessionId, Topic, TopicId, TopicUpdate, UsageDimension, UsageRecord,
    WriteOutcome,
};
use super::{InterviewStore, StoreError};
use crate::conversation::Message;

const SESSION_COLUMNS: &str = "id, topic_id, persona_id, interviewer_prompt, persona_prompt, \
     messages, conclusion, persona_summary, highlights, lease_token, created_at, updated_at";

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    pub async fn new(path: &Path) -> Result<Self, StoreError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::connection(format!("Failed to create directory: {e}"))
            })?;
        }

        let options = SqliteConnectOptions::from_str(&format!("sqlite://{}", path.display()))
            .map_err(|e| StoreError::connection(format!("Invalid SQLite path: {e}")))?
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        Self::connect(options).await
    }

    pub async fn new_in_memory() -> Result<Self, StoreError> {
        let options = SqliteConnectOptions::from_str("sqlite::memory:")
            .map_err(|e| StoreError::connection(format!("Invalid SQLite path: {e}")))?
            .foreign_keys(true);

        Self::connect(options).await
    }

    async fn connect(options: SqliteConnectOptions) -> Result<Self, StoreError> {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(options)
            .await
            .map_err(|e| StoreError::connection(format!("Failed to connect to SQLite: {e}")))?;

        let store = Self { pool };
        store.run_migrations().await?;

        Ok(store)
    }

    async fn run_migrations(&self) -> Result<(), StoreError> {
        let statements = [
            (
                "topics table",
                r#"
                CREATE TABLE IF NOT EXISTS topics (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    role TEXT NOT NULL,
                    topic TEXT NOT NULL,
                    report TEXT NOT NULL DEFAULT '',
                    study_summary TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "scout runs table",
                r#"
                CREATE TABLE IF NOT EXISTS scout_runs (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    description TEXT NOT NULL,
                    messages TEXT NOT NULL DEFAULT '[]',
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL
                )
                "#,
            ),
            (
                "personas table",
                r#"
                CREATE TABLE IF NOT EXISTS personas (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    name TEXT NOT NULL,
                    tags TEXT NOT NULL DEFAULT '[]',
                    prompt TEXT NOT NULL,
                    scout_run_id INTEGER,
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (scout_run_id) REFERENCES scout_runs(id) ON DELETE SET NULL
                )
                "#,
            ),
            (
                "personas scout index",
                r#"
                CREATE INDEX IF NOT EXISTS idx_personas_scout_run
                ON personas(scout_run_id)
                "#,
            ),
            (
                "sessions table",
                r#"
                CREATE TABLE IF NOT EXISTS interview_sessions (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    topic_id INTEGER NOT NULL,
                    persona_id INTEGER NOT NULL,
                    interviewer_prompt TEXT NOT NULL DEFAULT '',
                    persona_prompt TEXT NOT NULL DEFAULT '',
                    messages TEXT NOT NULL DEFAULT '[]',
                    conclusion TEXT NOT NULL DEFAULT '',
                    persona_summary TEXT NOT NULL DEFAULT '',
                    highlights TEXT NOT NULL DEFAULT '',
                    lease_token TEXT,
                    created_at TEXT NOT NULL,
                    updated_at TEXT NOT NULL,
                    FOREIGN KEY (topic_id) REFERENCES topics(id) ON DELETE CASCADE,
                    FOREIGN KEY (persona_id) REFERENCES personas(id) ON DELETE CASCADE,
                    UNIQUE(topic_id, persona_id)
                )
                "#,
            ),
            (
                "usage table",
                r#"
                CREATE TABLE IF NOT EXISTS usage_records (
                    id INTEGER PRIMARY KEY AUTOINCREMENT,
                    session_id INTEGER,
                    dimension TEXT NOT NULL,
                    value INTEGER NOT NULL,
                    metadata TEXT NOT NULL DEFAULT '{}',
                    created_at TEXT NOT NULL,
                    FOREIGN KEY (session_id) REFERENCES interview_sessions(id) ON DELETE SET NULL
                )
                "#,
            ),
            (
                "usage index",
                r#"
                CREATE INDEX IF NOT EXISTS idx_usage_records_session
                ON usage_records(session_id)
                "#,
            ),
        ];

        for (name, sql) in statements {
            sqlx::query(sql)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::migration(format!("Failed to create {name}: {e}")))?;
        }

        Ok(())
    }

    async fn fetch_session(
        &self,
        filter: &str,
        bind_a: i64,
        bind_b: Option<i64>,
    ) -> Result<Option<Session>, StoreError> {
        let sql = format!("SELECT {SESSION_COLUMNS} FROM interview_sessions WHERE {filter}");
        let mut query = sqlx::query(&sql).bind(bind_a);
        if let Some(b) = bind_b {
            query = query.bind(b);
        }
        let row = query
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to load session: {e}")))?;

        row.as_ref().map(session_from_row).transpose()
    }
}

fn column<'r, T>(row: &'r SqliteRow, name: &str) -> Result<T, StoreError>
where
    T: sqlx::Decode<'r, sqlx::Sqlite> + sqlx::Type<sqlx::Sqlite>,
{
    row.try_get(name)
        .map_err(|e| StoreError::database(format!("Failed to read column {name}: {e}")))
}

fn json_column<T: serde::de::DeserializeOwned>(
    row: &SqliteRow,
    name: &str,
) -> Result<T, StoreError> {
    let raw: String = column(row, name)?;
    serde_json::from_str(&raw)
        .map_err(|e| StoreError::serialization(format!("Invalid {name} data: {e}")))
}

fn to_json<T: serde::Serialize + ?Sized>(value: &T, what: &str) -> Result<String, StoreError> {
    serde_json::to_string(value)
        .map_err(|e| StoreError::serialization(format!("Failed to serialize {what}: {e}")))
}

fn session_from_row(row: &SqliteRow) -> Result<Session, StoreError> {
    Ok(Session {
        id: SessionId(column(row, "id")?),
        topic_id: TopicId(column(row, "topic_id")?),
        persona_id: PersonaId(column(row, "persona_id")?),
        interviewer_prompt: column(row, "interviewer_prompt")?,
        persona_prompt: column(row, "persona_prompt")?,
        messages: json_column(row, "messages")?,
        conclusion: column(row, "conclusion")?,
        persona_summary: column(row, "persona_summary")?,
        highlights: column(row, "highlights")?,
        lease: column::<Option<String>>(row, "lease_token")?.map(LeaseToken),
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn topic_from_row(row: &SqliteRow) -> Result<Topic, StoreError> {
    Ok(Topic {
        id: TopicId(column(row, "id")?),
        role: column(row, "role")?,
        topic: column(row, "topic")?,
        report: column(row, "report")?,
        study_summary: column(row, "study_summary")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn persona_from_row(row: &SqliteRow) -> Result<Persona, StoreError> {
    Ok(Persona {
        id: PersonaId(column(row, "id")?),
        name: column(row, "name")?,
        tags: json_column(row, "tags")?,
        prompt: column(row, "prompt")?,
        scout_run_id: column::<Option<i64>>(row, "scout_run_id")?.map(ScoutRunId),
        created_at: column(row, "created_at")?,
    })
}

fn scout_run_from_row(row: &SqliteRow) -> Result<ScoutRun, StoreError> {
    Ok(ScoutRun {
        id: ScoutRunId(column(row, "id")?),
        description: column(row, "description")?,
        messages: json_column(row, "messages")?,
        created_at: column(row, "created_at")?,
        updated_at: column(row, "updated_at")?,
    })
}

fn usage_from_row(row: &SqliteRow) -> Result<UsageRecord, StoreError> {
    let dimension: String = column(row, "dimension")?;
    Ok(UsageRecord {
        id: column(row, "id")?,
        session_id: column::<Option<i64>>(row, "session_id")?.map(SessionId),
        dimension: UsageDimension::from_str(&dimension).map_err(|e| {
            StoreError::serialization(format!("Unknown usage dimension {dimension}: {e}"))
        })?,
        value: column(row, "value")?,
        metadata: json_column(row, "metadata")?,
        created_at: column(row, "created_at")?,
    })
}

fn now() -> DateTime<Utc> {
    Utc::now()
}

#[async_trait]
impl InterviewStore for SqliteStore {
    async fn upsert_session(
        &self,
        topic_id: TopicId,
        persona_id: PersonaId,
    ) -> Result<Session, StoreError> {
        let ts = now();
        sqlx::query(
            r#"
            INSERT INTO interview_sessions (topic_id, persona_id, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?3)
            ON CONFLICT(topic_id, persona_id) DO NOTHING
            "#,
        )
        .bind(topic_id.0)
        .bind(persona_id.0)
        .bind(ts)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to upsert session: {e}")))?;

        self.find_session(topic_id, persona_id)
            .await?
            .ok_or_else(|| StoreError::not_found("Session", format!("{topic_id}/{persona_id}")))
    }

    async fn get_session(&self, session_id: SessionId) -> Result<Session, StoreError> {
        self.fetch_session("id = ?1", session_id.0, None)
            .await?
            .ok_or_else(|| StoreError::not_found("Session", session_id))
    }

    async fn find_session(
        &self,
        topic_id: TopicId,
        persona_id: PersonaId,
    ) -> Result<Option<Session>, StoreError> {
        self.fetch_session(
            "topic_id = ?1 AND persona_id = ?2",
            topic_id.0,
            Some(persona_id.0),
        )
        .await
    }

    async fn list_sessions_for_topic(
        &self,
        topic_id: TopicId,
    ) -> Result<Vec<Session>, StoreError> {
        let sql = format!(
            "SELECT {SESSION_COLUMNS} FROM interview_sessions WHERE topic_id = ?1 ORDER BY id ASC"
        );
        let rows = sqlx::query(&sql)
            .bind(topic_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to list sessions: {e}")))?;

        rows.iter().map(session_from_row).collect()
    }

    async fn update_prompts(
        &self,
        session_id: SessionId,
        interviewer_prompt: &str,
        persona_prompt: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET interviewer_prompt = ?1, persona_prompt = ?2, updated_at = ?3
            WHERE id = ?4
            "#,
        )
        .bind(interviewer_prompt)
        .bind(persona_prompt)
        .bind(now())
        .bind(session_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to update prompts: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Session", session_id));
        }
        Ok(())
    }

    async fn set_lease(
        &self,
        session_id: SessionId,
        token: Option<&LeaseToken>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE interview_sessions SET lease_token = ?1, updated_at = ?2 WHERE id = ?3",
        )
        .bind(token.map(LeaseToken::as_str))
        .bind(now())
        .bind(session_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to set lease: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Session", session_id));
        }
        Ok(())
    }

    async fn release_lease(
        &self,
        session_id: SessionId,
        token: &LeaseToken,
    ) -> Result<bool, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET lease_token = NULL, updated_at = ?1
            WHERE id = ?2 AND lease_token = ?3
            "#,
        )
        .bind(now())
        .bind(session_id.0)
        .bind(token.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to release lease: {e}")))?;

        Ok(result.rows_affected() > 0)
    }

    async fn write_messages(
        &self,
        session_id: SessionId,
        expected: &LeaseToken,
        messages: &[Message],
    ) -> WriteOutcome {
        let payload = match to_json(messages, "messages") {
            Ok(payload) => payload,
            Err(e) => {
                return WriteOutcome::Failed {
                    message: e.to_string(),
                };
            }
        };

        let result = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET messages = ?1, updated_at = ?2
            WHERE id = ?3 AND lease_token = ?4
            "#,
        )
        .bind(payload)
        .bind(now())
        .bind(session_id.0)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await;

        match result {
            Ok(done) if done.rows_affected() > 0 => WriteOutcome::Written,
            Ok(_) => {
                warn!(
                    target: "store::sqlite",
                    %session_id,
                    "Lease no longer held, skipping transcript write"
                );
                WriteOutcome::Skipped
            }
            Err(e) => WriteOutcome::Failed {
                message: format!("Failed to write messages: {e}"),
            },
        }
    }

    async fn save_conclusion(
        &self,
        session_id: SessionId,
        record: &ConclusionRecord,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE interview_sessions
            SET conclusion = ?1, persona_summary = ?2, highlights = ?3, updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(&record.conclusion)
        .bind(&record.persona_summary)
        .bind(&record.highlights)
        .bind(now())
        .bind(session_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to save conclusion: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Session", session_id));
        }
        Ok(())
    }

    async fn create_topic(&self, topic: NewTopic) -> Result<Topic, StoreError> {
        let ts = now();
        let result = sqlx::query(
            "INSERT INTO topics (role, topic, created_at, updated_at) VALUES (?1, ?2, ?3, ?3)",
        )
        .bind(&topic.role)
        .bind(&topic.topic)
        .bind(ts)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to create topic: {e}")))?;

        self.get_topic(TopicId(result.last_insert_rowid())).await
    }

    async fn get_topic(&self, topic_id: TopicId) -> Result<Topic, StoreError> {
        let row = sqlx::query("SELECT * FROM topics WHERE id = ?1")
            .bind(topic_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to load topic: {e}")))?
            .ok_or_else(|| StoreError::not_found("Topic", topic_id))?;

        topic_from_row(&row)
    }

    async fn update_topic(
        &self,
        topic_id: TopicId,
        update: TopicUpdate,
    ) -> Result<Topic, StoreError> {
        let result = sqlx::query(
            r#"
            UPDATE topics
            SET role = COALESCE(?1, role),
                topic = COALESCE(?2, topic),
                report = COALESCE(?3, report),
                updated_at = ?4
            WHERE id = ?5
            "#,
        )
        .bind(update.role)
        .bind(update.topic)
        .bind(update.report)
        .bind(now())
        .bind(topic_id.0)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to update topic: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Topic", topic_id));
        }
        self.get_topic(topic_id).await
    }

    async fn save_study_summary(
        &self,
        topic_id: TopicId,
        summary: &str,
    ) -> Result<(), StoreError> {
        let result =
            sqlx::query("UPDATE topics SET study_summary = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(summary)
                .bind(now())
                .bind(topic_id.0)
                .execute(&self.pool)
                .await
                .map_err(|e| StoreError::database(format!("Failed to save summary: {e}")))?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("Topic", topic_id));
        }
        Ok(())
    }

    async fn list_topics(&self, limit: usize) -> Result<Vec<Topic>, StoreError> {
        let limit = i64::try_from(limit).unwrap_or(i64::MAX);
        let rows = sqlx::query("SELECT * FROM topics ORDER BY id DESC LIMIT ?1")
            .bind(limit)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to list topics: {e}")))?;

        rows.iter().map(topic_from_row).collect()
    }

    async fn create_persona(&self, persona: NewPersona) -> Result<Persona, StoreError> {
        let tags = to_json(&persona.tags, "tags")?;
        let result = sqlx::query(
            r#"
            INSERT INTO personas (name, tags, prompt, scout_run_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&persona.name)
        .bind(tags)
        .bind(&persona.prompt)
        .bind(persona.scout_run_id.map(|id| id.0))
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to create persona: {e}")))?;

        self.get_persona(PersonaId(result.last_insert_rowid()))
            .await
    }

    async fn get_persona(&self, persona_id: PersonaId) -> Result<Persona, StoreError> {
        let row = sqlx::query("SELECT * FROM personas WHERE id = ?1")
            .bind(persona_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to load persona: {e}")))?
            .ok_or_else(|| StoreError::not_found("Persona", persona_id))?;

        persona_from_row(&row)
    }

    async fn list_personas(&self) -> Result<Vec<Persona>, StoreError> {
        let rows = sqlx::query("SELECT * FROM personas ORDER BY id ASC")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to list personas: {e}")))?;

        rows.iter().map(persona_from_row).collect()
    }

    async fn list_personas_for_scout_run(
        &self,
        scout_run_id: ScoutRunId,
    ) -> Result<Vec<Persona>, StoreError> {
        let rows = sqlx::query("SELECT * FROM personas WHERE scout_run_id = ?1 ORDER BY id DESC")
            .bind(scout_run_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to list scouted personas: {e}")))?;

        rows.iter().map(persona_from_row).collect()
    }

    async fn create_scout_run(&self, description: &str) -> Result<ScoutRun, StoreError> {
        let result = sqlx::query(
            "INSERT INTO scout_runs (description, created_at, updated_at) VALUES (?1, ?2, ?2)",
        )
        .bind(description)
        .bind(now())
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to create scout run: {e}")))?;

        self.get_scout_run(ScoutRunId(result.last_insert_rowid()))
            .await
    }

    async fn get_scout_run(&self, scout_run_id: ScoutRunId) -> Result<ScoutRun, StoreError> {
        let row = sqlx::query("SELECT * FROM scout_runs WHERE id = ?1")
            .bind(scout_run_id.0)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to load scout run: {e}")))?
            .ok_or_else(|| StoreError::not_found("ScoutRun", scout_run_id))?;

        scout_run_from_row(&row)
    }

    async fn save_scout_messages(
        &self,
        scout_run_id: ScoutRunId,
        messages: &[Message],
    ) -> Result<(), StoreError> {
        let payload = to_json(messages, "messages")?;
        let result =
            sqlx::query("UPDATE scout_runs SET messages = ?1, updated_at = ?2 WHERE id = ?3")
                .bind(payload)
                .bind(now())
                .bind(scout_run_id.0)
                .execute(&self.pool)
                .await
                .map_err(|e| {
                    StoreError::database(format!("Failed to save scout messages: {e}"))
                })?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found("ScoutRun", scout_run_id));
        }
        Ok(())
    }

    async fn record_usage(&self, usage: NewUsage) -> Result<UsageRecord, StoreError> {
        let metadata = to_json(&usage.metadata, "usage metadata")?;
        let created_at = now();
        let result = sqlx::query(
            r#"
            INSERT INTO usage_records (session_id, dimension, value, metadata, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(usage.session_id.map(|id| id.0))
        .bind(usage.dimension.to_string())
        .bind(usage.value)
        .bind(metadata)
        .bind(created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::database(format!("Failed to record usage: {e}")))?;

        Ok(UsageRecord {
            id: result.last_insert_rowid(),
            session_id: usage.session_id,
            dimension: usage.dimension,
            value: usage.value,
            metadata: usage.metadata,
            created_at,
        })
    }

    async fn usage_for_session(
        &self,
        session_id: SessionId,
    ) -> Result<Vec<UsageRecord>, StoreError> {
        let rows = sqlx::query("SELECT * FROM usage_records WHERE session_id = ?1 ORDER BY id ASC")
            .bind(session_id.0)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| StoreError::database(format!("Failed to load usage: {e}")))?;

        rows.iter().map(usage_from_row).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn seeded() -> (SqliteStore, TopicId, PersonaId) {
        let store = SqliteStore::new_in_memory().await.unwrap();
        let topic = store
            .create_topic(NewTopic {
                role: "product researcher".to_string(),
                topic: "oat milk".to_string(),
            })
            .await
            .unwrap();
        let persona = store
            .create_persona(NewPersona {
                name: "Lin".to_string(),
                tags: vec!["student".to_string()],
                prompt: "You are Lin.".to_string(),
                scout_run_id: None,
            })
            .await
            .unwrap();
        (store, topic.id, persona.id)
    }

    #[tokio::test]
    async fn release_requires_the_current_token() {
        let (store, topic_id, persona_id) = seeded().await;
        let session = store.upsert_session(topic_id, persona_id).await.unwrap();
        let mine = LeaseToken::generate();
        store.set_lease(session.id, Some(&mine)).await.unwrap();

        assert!(
            !store
                .release_lease(session.id, &LeaseToken::generate())
                .await
                .unwrap()
        );
        assert!(store.release_lease(session.id, &mine).await.unwrap());
        assert!(!store.get_session(session.id).await.unwrap().is_leased());
    }

    #[tokio::test]
    async fn session_for_unknown_topic_is_rejected() {
        let (store, _, persona_id) = seeded().await;
        let err = store
            .upsert_session(TopicId(999), persona_id)
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database { .. }));
    }

    #[tokio::test]
    async fn topic_updates_are_partial() {
        let (store, topic_id, _) = seeded().await;
        let updated = store
            .update_topic(
                topic_id,
                TopicUpdate {
                    report: Some("<h1>report</h1>".to_string()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.topic, "oat milk");
        assert_eq!(updated.report, "<h1>report</h1>");

        store.save_study_summary(topic_id, "summary").await.unwrap();
        assert_eq!(
            store.get_topic(topic_id).await.unwrap().study_summary.as_deref(),
            Some("summary")
        );
    }

    #[tokio::test]
    async fn scouted_personas_link_back_to_their_run() {
        let (store, _, hand_made) = seeded().await;
        let run = store.create_scout_run("帮我寻找燕麦奶用户").await.unwrap();
        let scouted = store
            .create_persona(NewPersona {
                name: "Mia".to_string(),
                tags: vec!["健身".to_string()],
                prompt: "你是Mia".to_string(),
                scout_run_id: Some(run.id),
            })
            .await
            .unwrap();

        assert_eq!(scouted.scout_run_id, Some(run.id));
        let listed = store.list_personas_for_scout_run(run.id).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, scouted.id);
        assert_ne!(listed[0].id, hand_made);

        let err = store
            .create_persona(NewPersona {
                name: "Ghost".to_string(),
                scout_run_id: Some(ScoutRunId(999)),
                ..Default::default()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::Database { .. }));
    }

    #[tokio::test]
    async fn scout_messages_replace_the_stored_conversation() {
        let (store, _, _) = seeded().await;
        let run = store.create_scout_run("帮我寻找咖啡用户").await.unwrap();
        assert!(run.messages.is_empty());

        let messages = vec![
            Message::user("帮我寻找咖啡用户"),
            Message::assistant("已保存3个用户画像"),
        ];
        store.save_scout_messages(run.id, &messages).await.unwrap();

        let stored = store.get_scout_run(run.id).await.unwrap();
        assert_eq!(stored.messages, messages);
        assert_eq!(stored.description, "帮我寻找咖啡用户");
        assert!(matches!(
            store.save_scout_messages(ScoutRunId(42), &messages).await,
            Err(StoreError::NotFound { .. })
        ));
    }

    #[tokio::test]
    async fn usage_is_recorded_per_session() {
        let (store, topic_id, persona_id) = seeded().await;
        let session = store.upsert_session(topic_id, persona_id).await.unwrap();
        store
            .record_usage(NewUsage {
                session_id: Some(session.id),
                dimension: UsageDimension::Tokens,
                value: 42,
                metadata: serde_json::json!({"role": "persona"}),
            })
            .await
            .unwrap();

        let usage = store.usage_for_session(session.id).await.unwrap();
        assert_eq!(usage.len(), 1);
        assert_eq!(usage[0].dimension, UsageDimension::Tokens);
        assert_eq!(usage[0].metadata["role"], "persona");
    }
}
