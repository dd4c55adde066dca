use super::{Expiring, Sweeper};
use crate::domain_model::{Session, SessionId};
use crate::domain_port::{SessionStore, StoreError};
use dashmap::DashMap;
use std::time::Duration;

#[derive(Debug, Default)]
pub struct MemorySessionStore {
    sessions: DashMap<String, Expiring<Session>>,
    sweeper: Sweeper,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn save(&self, session: &Session, ttl: Duration) -> Result<(), StoreError> {
        if self.sweeper.due() {
            self.sessions.retain(|_, slot| slot.is_live());
        }
        self.sessions
            .insert(session.id.0.clone(), Expiring::new(session.clone(), ttl));
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        Ok(self
            .sessions
            .get(&id.0)
            .filter(|slot| slot.is_live())
            .map(|slot| slot.value.clone()))
    }
}
