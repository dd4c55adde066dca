use crate::domain_model::{Email, OtpHash, OtpRecord};
use crate::domain_port::*;
use anyhow::anyhow;
use chrono::{DateTime, Utc};
use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Script};
use std::collections::HashMap;
use std::time::Duration;

const OTP_RECORD_FAILURE: &str = include_str!("otp_record_failure.lua");
const OTP_RECORD_CONSUME: &str = include_str!("otp_record_consume.lua");

/// OTP records as Redis hashes: `h` (hex digest), `tries`, `issued_at` and
/// `expires_at` (unix millis). Key expiry is the source of truth for expiry.
pub struct RedisOtpStore {
    conn: ConnectionManager,
    prefix: String,
    failure_script: Script,
    consume_script: Script,
}

impl RedisOtpStore {
    pub fn new(conn: ConnectionManager, prefix: impl Into<String>) -> Self {
        RedisOtpStore {
            conn,
            prefix: prefix.into(),
            failure_script: Script::new(OTP_RECORD_FAILURE),
            consume_script: Script::new(OTP_RECORD_CONSUME),
        }
    }

    fn key(&self, email: &Email) -> String {
        format!("{}:otp:{}", self.prefix, email)
    }

    fn parse_record(
        email: &Email,
        fields: &HashMap<String, String>,
    ) -> Result<OtpRecord, StoreError> {
        let field = |name: &str| {
            fields
                .get(name)
                .ok_or_else(|| StoreError::InternalError(anyhow!("otp record missing `{name}`")))
        };
        let millis = |name: &str| -> Result<DateTime<Utc>, StoreError> {
            let raw: i64 = field(name)?
                .parse()
                .map_err(|e| StoreError::InternalError(anyhow!("otp record `{name}`: {e}")))?;
            DateTime::from_timestamp_millis(raw)
                .ok_or_else(|| StoreError::InternalError(anyhow!("otp record `{name}` out of range")))
        };

        let retries_remaining: u32 = field("tries")?
            .parse()
            .map_err(|e| StoreError::InternalError(anyhow!("otp record `tries`: {e}")))?;

        Ok(OtpRecord {
            email: email.clone(),
            hashed_otp: OtpHash(field("h")?.clone()),
            issued_at: millis("issued_at")?,
            expires_at: millis("expires_at")?,
            retries_remaining,
        })
    }
}

fn ttl_secs(ttl: Duration) -> i64 {
    // Redis TTLs are whole seconds; round up so a record never dies early.
    let secs = ttl.as_secs() + u64::from(ttl.subsec_nanos() > 0);
    secs.max(1) as i64
}

#[async_trait::async_trait]
impl OtpStore for RedisOtpStore {
    async fn get(&self, email: &Email) -> Result<Option<OtpRecord>, StoreError> {
        let key = self.key(email);
        let mut conn = self.conn.clone();
        let fields: HashMap<String, String> = conn
            .hgetall(&key)
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;
        if fields.is_empty() {
            return Ok(None);
        }
        let record = Self::parse_record(email, &fields)?;
        Ok(record.is_usable().then_some(record))
    }

    async fn replace(&self, record: &OtpRecord, ttl: Duration) -> Result<bool, StoreError> {
        let key = self.key(&record.email);
        let mut conn = self.conn.clone();
        let fields = [
            ("h", record.hashed_otp.0.clone()),
            ("tries", record.retries_remaining.to_string()),
            ("issued_at", record.issued_at.timestamp_millis().to_string()),
            ("expires_at", record.expires_at.timestamp_millis().to_string()),
        ];

        let (deleted,): (i64,) = redis::pipe()
            .atomic()
            .del(&key)
            .hset_multiple(&key, &fields)
            .ignore()
            .expire(&key, ttl_secs(ttl))
            .ignore()
            .query_async(&mut conn)
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;

        Ok(deleted > 0)
    }

    async fn record_failure(
        &self,
        email: &Email,
        expected: &OtpHash,
    ) -> Result<Option<u32>, StoreError> {
        let key = self.key(email);
        let mut conn = self.conn.clone();
        let left: i64 = self
            .failure_script
            .key(&key)
            .arg(&expected.0)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;

        match left {
            -1 => Ok(None),
            n if n >= 0 => Ok(Some(n as u32)),
            _ => Err(StoreError::InternalError(anyhow!(
                "unknown script status"
            ))),
        }
    }

    async fn consume(&self, email: &Email, expected: &OtpHash) -> Result<bool, StoreError> {
        let key = self.key(email);
        let mut conn = self.conn.clone();
        let removed: i64 = self
            .consume_script
            .key(&key)
            .arg(&expected.0)
            .invoke_async(&mut conn)
            .await
            .map_err(|e| StoreError::Store(e.to_string()))?;
        Ok(removed == 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn email() -> Email {
        Email::parse("a@x.example.gov").unwrap()
    }

    #[test]
    fn ttl_rounds_up_to_whole_seconds() {
        assert_eq!(ttl_secs(Duration::from_secs(300)), 300);
        assert_eq!(ttl_secs(Duration::from_millis(1500)), 2);
        assert_eq!(ttl_secs(Duration::ZERO), 1);
    }

    #[test]
    fn parses_stored_fields() {
        let fields: HashMap<String, String> = [
            ("h", "abcd"),
            ("tries", "2"),
            ("issued_at", "1700000000000"),
            ("expires_at", "1700000300000"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        let record = RedisOtpStore::parse_record(&email(), &fields).unwrap();
        assert_eq!(record.hashed_otp, OtpHash("abcd".to_string()));
        assert_eq!(record.retries_remaining, 2);
        assert_eq!(
            (record.expires_at - record.issued_at).num_seconds(),
            300
        );
    }

    #[test]
    fn missing_fields_are_internal_errors() {
        let fields: HashMap<String, String> =
            [("h".to_string(), "abcd".to_string())].into_iter().collect();
        assert!(matches!(
            RedisOtpStore::parse_record(&email(), &fields),
            Err(StoreError::InternalError(_))
        ));
    }
}
