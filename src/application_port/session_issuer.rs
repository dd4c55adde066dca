use super::AuthError;
use crate::domain_model::{Email, Session, SessionId};

/// Turns a proven email address into a session.
///
/// Every failure is reported as [`AuthError::Session`]: by the time this runs
/// the caller has already proven control of the address.
#[async_trait::async_trait]
pub trait SessionIssuer: Send + Sync {
    async fn issue(&self, email: &Email) -> Result<Session, AuthError>;
    async fn resolve(&self, id: &SessionId) -> Result<Option<Session>, AuthError>;
}
