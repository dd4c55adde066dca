use crate::domain_model::*;
use crate::domain_port::*;
use redis::aio::ConnectionManager;
use redis::{
    AsyncCommands, FromRedisValue, RedisError, RedisResult, RedisWrite, ToRedisArgs, Value,
};
use std::time::Duration;

pub struct RedisSessionStore {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisSessionStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisSessionStore {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, id: &SessionId) -> String {
        format!("{}:session:{}", self.prefix, id)
    }
}

impl ToRedisArgs for Session {
    fn write_redis_args<W>(&self, out: &mut W)
    where
        W: ?Sized + RedisWrite,
    {
        // Session holds only strings, ids and timestamps; encoding cannot fail.
        let json = serde_json::to_vec(self).unwrap_or_default();
        out.write_arg(&json)
    }
}

impl FromRedisValue for Session {
    fn from_redis_value(v: &Value) -> RedisResult<Self> {
        let raw: String = redis::from_redis_value(v)?;
        let session = serde_json::from_str::<Session>(&raw).map_err(|e| {
            RedisError::from((
                redis::ErrorKind::TypeError,
                "invalid Session json",
                e.to_string(),
            ))
        })?;
        Ok(session)
    }
}

#[async_trait::async_trait]
impl SessionStore for RedisSessionStore {
    async fn save(&self, session: &Session, ttl: Duration) -> Result<(), StoreError> {
        let key = self.key(&session.id);
        let mut conn = self.conn.clone();
        let _: () = conn
            .set_ex(&key, session, ttl.as_secs().max(1))
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;
        Ok(())
    }

    async fn get(&self, id: &SessionId) -> Result<Option<Session>, StoreError> {
        let key = self.key(id);
        let mut conn = self.conn.clone();
        let session: Option<Session> = conn
            .get(&key)
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;
        Ok(session)
    }
}
