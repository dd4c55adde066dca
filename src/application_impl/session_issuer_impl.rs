use crate::application_port::{AuthError, SessionIssuer};
use crate::domain_model::{Email, Session, SessionId};
use crate::domain_port::{SessionStore, UserDirectory};
use chrono::Utc;
use nanoid::nanoid;
use std::sync::Arc;
use std::time::Duration;
use tracing::error;

const SESSION_ID_LEN: usize = 32;

pub struct RealSessionIssuer {
    directory: Arc<dyn UserDirectory>,
    store: Arc<dyn SessionStore>,
    ttl: Duration,
}

impl RealSessionIssuer {
    pub fn new(
        directory: Arc<dyn UserDirectory>,
        store: Arc<dyn SessionStore>,
        ttl: Duration,
    ) -> Self {
        Self {
            directory,
            store,
            ttl,
        }
    }

    #[inline]
    fn new_session_id() -> SessionId {
        SessionId(nanoid!(SESSION_ID_LEN))
    }
}

#[async_trait::async_trait]
impl SessionIssuer for RealSessionIssuer {
    async fn issue(&self, email: &Email) -> Result<Session, AuthError> {
        let user = self
            .directory
            .find_or_create_by_email(email)
            .await
            .inspect_err(|e| error!(%email, error = %e, "user lookup failed after otp verification"))?;

        let now = Utc::now();
        let session = Session {
            id: Self::new_session_id(),
            user,
            created_at: now,
            expires_at: now + self.ttl,
        };

        self.store.save(&session, self.ttl).await.map_err(|e| {
            error!(%email, error = %e, "failed to persist session");
            AuthError::Session(e.to_string())
        })?;

        Ok(session)
    }

    async fn resolve(&self, id: &SessionId) -> Result<Option<Session>, AuthError> {
        self.store
            .get(id)
            .await
            .map_err(|e| AuthError::Session(e.to_string()))
    }
}
