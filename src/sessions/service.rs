use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::info;
use thiserror::Error;

use crate::db::{
    models::validation::ValidationError, Session, SessionCommit, SessionCreate, SessionUpdate,
};

use super::SessionStore;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    /// The record does not exist or belongs to another user. The two cases
    /// are deliberately indistinguishable to the caller.
    #[error("Session not found")]
    NotFound,
    #[error("session store failure: {0:#}")]
    Storage(#[from] anyhow::Error),
}

pub type ServiceResult<T> = Result<T, ServiceError>;

/// Session CRUD scoped to an authenticated user. Every lookup checks that the
/// record's owner matches `user_id` before returning or mutating it.
#[derive(Clone)]
pub struct SessionService {
    store: Arc<dyn SessionStore>,
}

impl SessionService {
    pub fn new(store: Arc<dyn SessionStore>) -> Self {
        Self { store }
    }

    pub async fn create_session(&self, user_id: &str, request: SessionCreate) -> ServiceResult<Session> {
        let draft = request.validate()?;
        let session = Session::new(user_id, draft, Utc::now());
        self.store.insert(&session).await?;
        info!("Created session {} for user {}", session.id, user_id);
        Ok(session)
    }

    /// Stores a finished timer run as a single inactive record.
    pub async fn record_session(&self, user_id: &str, commit: SessionCommit) -> ServiceResult<Session> {
        commit.draft.validate()?;
        let session = Session::from_commit(user_id, commit, Utc::now());
        self.store.insert(&session).await?;
        info!(
            "Recorded {} minute session {} for user {}",
            session.duration_minutes.unwrap_or_default(),
            session.id,
            user_id
        );
        Ok(session)
    }

    pub async fn get_session(&self, user_id: &str, session_id: &str) -> ServiceResult<Session> {
        self.owned(user_id, session_id).await
    }

    pub async fn list_sessions(&self, user_id: &str) -> ServiceResult<Vec<Session>> {
        Ok(self.store.list_by_user(user_id).await?)
    }

    /// Sessions whose start falls on the same UTC calendar day as `now`.
    pub async fn list_sessions_on_day(
        &self,
        user_id: &str,
        now: DateTime<Utc>,
    ) -> ServiceResult<Vec<Session>> {
        let today = now.date_naive();
        let sessions = self.store.list_by_user(user_id).await?;
        Ok(sessions
            .into_iter()
            .filter(|session| session.start_time.date_naive() == today)
            .collect())
    }

    /// The most recently created session that is still active, if any.
    pub async fn active_session(&self, user_id: &str) -> ServiceResult<Option<Session>> {
        let sessions = self.store.list_by_user(user_id).await?;
        Ok(sessions.into_iter().rev().find(|session| session.is_active))
    }

    pub async fn update_session(
        &self,
        user_id: &str,
        session_id: &str,
        update: SessionUpdate,
    ) -> ServiceResult<Session> {
        let mut session = self.owned(user_id, session_id).await?;
        session.apply_update(update, Utc::now())?;
        self.persist(&session).await?;
        Ok(session)
    }

    pub async fn end_session(&self, user_id: &str, session_id: &str) -> ServiceResult<Session> {
        let mut session = self.owned(user_id, session_id).await?;
        session.end(Utc::now())?;
        self.persist(&session).await?;
        info!(
            "Ended session {} after {} minutes",
            session.id,
            session.duration_minutes.unwrap_or_default()
        );
        Ok(session)
    }

    pub async fn delete_session(&self, user_id: &str, session_id: &str) -> ServiceResult<()> {
        self.owned(user_id, session_id).await?;
        if !self.store.delete(session_id).await? {
            return Err(ServiceError::NotFound);
        }
        info!("Deleted session {session_id}");
        Ok(())
    }

    async fn owned(&self, user_id: &str, session_id: &str) -> ServiceResult<Session> {
        match self.store.get(session_id).await? {
            Some(session) if session.user_id == user_id => Ok(session),
            _ => Err(ServiceError::NotFound),
        }
    }

    async fn persist(&self, session: &Session) -> ServiceResult<()> {
        if self.store.update(session).await? {
            Ok(())
        } else {
            Err(ServiceError::NotFound)
        }
    }
}
