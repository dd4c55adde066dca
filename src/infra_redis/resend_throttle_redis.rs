use crate::domain_model::Email;
use crate::domain_port::*;
use redis::AsyncCommands;
use redis::aio::ConnectionManager;
use std::time::Duration;

/// Cooldown markers stored under their own key so they can outlive the OTP.
pub struct RedisResendThrottle {
    conn: ConnectionManager,
    prefix: String,
}

impl RedisResendThrottle {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisResendThrottle {
            conn,
            prefix: prefix.into(),
        }
    }

    fn key(&self, email: &Email) -> String {
        format!("{}:resend:{}", self.prefix, email)
    }

    async fn pttl(&self, key: &str) -> Result<Option<Duration>, StoreError> {
        let mut conn = self.conn.clone();
        let millis: i64 = conn
            .pttl(key)
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;
        // -2: no key, -1: no expiry (never written that way)
        Ok((millis > 0).then(|| Duration::from_millis(millis as u64)))
    }
}

#[async_trait::async_trait]
impl ResendThrottle for RedisResendThrottle {
    async fn remaining(&self, email: &Email) -> Result<Option<Duration>, StoreError> {
        self.pttl(&self.key(email)).await
    }

    async fn record_resend_issued(
        &self,
        email: &Email,
        cooldown: Duration,
    ) -> Result<ThrottleDecision, StoreError> {
        let key = self.key(email);
        let mut conn = self.conn.clone();
        let cooldown_ms = cooldown.as_millis().max(1) as u64;
        let set: Option<String> = redis::cmd("SET")
            .arg(&key)
            .arg(chrono::Utc::now().timestamp_millis())
            .arg("NX")
            .arg("PX")
            .arg(cooldown_ms)
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;

        if set.is_some() {
            return Ok(ThrottleDecision::Allowed);
        }
        // the marker may lapse between SET and PTTL; still report a wait
        let retry_after = self
            .pttl(&key)
            .await?
            .unwrap_or(Duration::from_millis(1));
        Ok(ThrottleDecision::Throttled { retry_after })
    }

    async fn release(&self, email: &Email) -> Result<(), StoreError> {
        let mut conn = self.conn.clone();
        let _: () = conn
            .del(self.key(email))
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;
        Ok(())
    }
}
