use super::StoreError;
use crate::domain_model::{Session, SessionId};
use std::time::Duration;

#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Save a session with TTL.
    async fn save(&self, session: &Session, ttl: Duration) -> Result<(), StoreError>;
    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError>;
}
