use anyhow::{Context, Result};
use async_trait::async_trait;
use rusqlite::{params, Row};

use crate::db::{
    helpers::{
        parse_activity_type, parse_datetime, parse_language, parse_optional_datetime, to_i64,
        to_u64,
    },
    models::Session,
    Database,
};
use crate::sessions::SessionStore;

const SESSION_COLUMNS: &str = "id, user_id, project_name, language, activity_type, start_time, \
     end_time, duration_minutes, notes, is_active, created_at, updated_at";

fn row_to_session(row: &Row) -> Result<Session> {
    let language: String = row.get("language")?;
    let activity_type: String = row.get("activity_type")?;
    let start_time: String = row.get("start_time")?;
    let end_time: Option<String> = row.get("end_time")?;
    let duration_minutes: Option<i64> = row.get("duration_minutes")?;
    let created_at: String = row.get("created_at")?;
    let updated_at: String = row.get("updated_at")?;

    Ok(Session {
        id: row.get("id")?,
        user_id: row.get("user_id")?,
        project_name: row.get("project_name")?,
        language: parse_language(&language)?,
        activity_type: parse_activity_type(&activity_type)?,
        start_time: parse_datetime(&start_time, "start_time")?,
        end_time: parse_optional_datetime(end_time, "end_time")?,
        duration_minutes: duration_minutes
            .map(|minutes| to_u64(minutes, "duration_minutes"))
            .transpose()?,
        notes: row.get("notes")?,
        is_active: row.get("is_active")?,
        created_at: parse_datetime(&created_at, "created_at")?,
        updated_at: parse_datetime(&updated_at, "updated_at")?,
    })
}

impl Database {
    pub async fn insert_session(&self, session: &Session) -> Result<()> {
        let record = session.clone();
        self.execute(move |conn| {
            conn.execute(
                "INSERT INTO sessions (id, user_id, project_name, language, activity_type, start_time,
                                       end_time, duration_minutes, notes, is_active, created_at, updated_at, seq)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12,
                         (SELECT COALESCE(MAX(seq), 0) + 1 FROM sessions))",
                params![
                    record.id,
                    record.user_id,
                    record.project_name,
                    record.language.as_str(),
                    record.activity_type.as_str(),
                    record.start_time.to_rfc3339(),
                    record.end_time.as_ref().map(|dt| dt.to_rfc3339()),
                    record.duration_minutes.map(to_i64).transpose()?,
                    record.notes,
                    record.is_active,
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339(),
                ],
            )
            .with_context(|| "failed to insert session")?;
            Ok(())
        })
        .await
    }

    pub async fn get_session(&self, session_id: &str) -> Result<Option<Session>> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let sql = format!("SELECT {SESSION_COLUMNS} FROM sessions WHERE id = ?1");
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![session_id])?;
            match rows.next()? {
                Some(row) => Ok(Some(row_to_session(row)?)),
                None => Ok(None),
            }
        })
        .await
    }

    /// All sessions owned by `user_id`, oldest insertion first.
    pub async fn list_sessions_for_user(&self, user_id: &str) -> Result<Vec<Session>> {
        let user_id = user_id.to_string();
        self.execute(move |conn| {
            let sql = format!(
                "SELECT {SESSION_COLUMNS} FROM sessions WHERE user_id = ?1 ORDER BY seq ASC"
            );
            let mut stmt = conn.prepare(&sql)?;
            let mut rows = stmt.query(params![user_id])?;
            let mut sessions = Vec::new();
            while let Some(row) = rows.next()? {
                sessions.push(row_to_session(row)?);
            }
            Ok(sessions)
        })
        .await
    }

    /// Overwrites the mutable columns of an existing session. Returns `false`
    /// when no row has that id.
    pub async fn update_session(&self, session: &Session) -> Result<bool> {
        let record = session.clone();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute(
                    "UPDATE sessions
                     SET project_name = ?1,
                         language = ?2,
                         activity_type = ?3,
                         end_time = ?4,
                         duration_minutes = ?5,
                         notes = ?6,
                         is_active = ?7,
                         updated_at = ?8
                     WHERE id = ?9",
                    params![
                        record.project_name,
                        record.language.as_str(),
                        record.activity_type.as_str(),
                        record.end_time.as_ref().map(|dt| dt.to_rfc3339()),
                        record.duration_minutes.map(to_i64).transpose()?,
                        record.notes,
                        record.is_active,
                        record.updated_at.to_rfc3339(),
                        record.id,
                    ],
                )
                .with_context(|| "failed to update session")?;
            Ok(rows_affected > 0)
        })
        .await
    }

    pub async fn delete_session(&self, session_id: &str) -> Result<bool> {
        let session_id = session_id.to_string();
        self.execute(move |conn| {
            let rows_affected = conn
                .execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
                .with_context(|| "failed to delete session")?;
            Ok(rows_affected > 0)
        })
        .await
    }
}

#[async_trait]
impl SessionStore for Database {
    async fn insert(&self, session: &Session) -> Result<()> {
        self.insert_session(session).await
    }

    async fn get(&self, session_id: &str) -> Result<Option<Session>> {
        self.get_session(session_id).await
    }

    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Session>> {
        self.list_sessions_for_user(user_id).await
    }

    async fn update(&self, session: &Session) -> Result<bool> {
        self.update_session(session).await
    }

    async fn delete(&self, session_id: &str) -> Result<bool> {
        self.delete_session(session_id).await
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, Utc};

    use super::*;
    use crate::db::models::{ActivityType, Language, SessionDraft};

    fn draft(project: &str) -> SessionDraft {
        SessionDraft {
            project_name: project.into(),
            language: Language::Rust,
            activity_type: ActivityType::Debugging,
            notes: Some("borrowck".into()),
        }
    }

    #[tokio::test]
    async fn insert_then_get_returns_same_record() {
        let db = Database::open_in_memory().unwrap();
        let session = Session::new("user_1", draft("alpha"), Utc::now());
        db.insert_session(&session).await.unwrap();

        let loaded = db.get_session(&session.id).await.unwrap().unwrap();
        assert_eq!(loaded.id, session.id);
        assert_eq!(loaded.language, Language::Rust);
        assert_eq!(loaded.notes.as_deref(), Some("borrowck"));
        assert!(loaded.is_active);
        assert!(db.get_session("missing").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn list_is_scoped_to_user_in_insertion_order() {
        let db = Database::open_in_memory().unwrap();
        let now = Utc::now();
        for name in ["first", "second", "third"] {
            db.insert_session(&Session::new("user_1", draft(name), now))
                .await
                .unwrap();
        }
        db.insert_session(&Session::new("user_2", draft("other"), now))
            .await
            .unwrap();

        let names: Vec<String> = db
            .list_sessions_for_user("user_1")
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.project_name)
            .collect();
        assert_eq!(names, vec!["first", "second", "third"]);
    }

    #[tokio::test]
    async fn update_and_delete_report_missing_rows() {
        let db = Database::open_in_memory().unwrap();
        let start = Utc::now();
        let mut session = Session::new("user_1", draft("alpha"), start);
        assert!(!db.update_session(&session).await.unwrap());

        db.insert_session(&session).await.unwrap();
        session.end(start + Duration::minutes(3)).unwrap();
        assert!(db.update_session(&session).await.unwrap());

        let loaded = db.get_session(&session.id).await.unwrap().unwrap();
        assert!(!loaded.is_active);
        assert_eq!(loaded.duration_minutes, Some(3));

        assert!(db.delete_session(&session.id).await.unwrap());
        assert!(!db.delete_session(&session.id).await.unwrap());
    }

    #[tokio::test]
    async fn schema_rejects_active_row_with_end_time() {
        let db = Database::open_in_memory().unwrap();
        let mut session = Session::new("user_1", draft("alpha"), Utc::now());
        session.end_time = Some(Utc::now());
        assert!(db.insert_session(&session).await.is_err());
    }
}
