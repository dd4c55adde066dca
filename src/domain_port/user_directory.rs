use crate::domain_model::{Email, UserIdentity};

#[async_trait::async_trait]
pub trait UserDirectory: Send + Sync {
    async fn find_or_create_by_email(&self, email: &Email) -> Result<UserIdentity, DirectoryError>;
}

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("user directory error: {0}")]
    Store(String),
    #[error("user directory inconsistency: {0}")]
    Inconsistent(String),
}
