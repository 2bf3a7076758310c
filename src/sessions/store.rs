use anyhow::Result;
use async_trait::async_trait;

use crate::db::Session;

/// Persistence for session records. Implementations do no validation and no
/// ownership checks; [`SessionService`](super::SessionService) owns both.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, session: &Session) -> Result<()>;

    async fn get(&self, session_id: &str) -> Result<Option<Session>>;

    /// Sessions owned by `user_id` in insertion order.
    async fn list_by_user(&self, user_id: &str) -> Result<Vec<Session>>;

    /// Returns `false` when no record has the session's id.
    async fn update(&self, session: &Session) -> Result<bool>;

    /// Returns `false` when no record has the id.
    async fn delete(&self, session_id: &str) -> Result<bool>;
}
