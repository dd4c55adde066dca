use crate::domain_port::*;
use redis::Script;
use redis::aio::ConnectionManager;
use std::time::Duration;

const REQUEST_WINDOW: &str = include_str!("request_window.lua");

pub struct RedisRequestLimiter {
    conn: ConnectionManager,
    prefix: String,
    script: Script,
}

impl RedisRequestLimiter {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisRequestLimiter {
            conn,
            prefix: prefix.into(),
            script: Script::new(REQUEST_WINDOW),
        }
    }

    fn key(&self, key: &str) -> String {
        format!("{}:requests:{}", self.prefix, key)
    }
}

#[async_trait::async_trait]
impl RequestLimiter for RedisRequestLimiter {
    async fn hit(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<ThrottleDecision, StoreError> {
        let mut conn = self.conn.clone();
        let (count, ttl_ms): (i64, i64) = self
            .script
            .key(self.key(key))
            .arg(window.as_millis().max(1) as u64)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;

        if count <= i64::from(limit) {
            Ok(ThrottleDecision::Allowed)
        } else {
            Ok(ThrottleDecision::Throttled {
                retry_after: Duration::from_millis(ttl_ms.max(1) as u64),
            })
        }
    }
}
