use crate::domain_model::{Email, OtpHash, OtpRecord};
use std::time::Duration;

/// Per-email home of the current OTP record.
///
/// Every mutating call is atomic with respect to other calls on the same
/// email. Conditional operations take the hash the caller last read, so a
/// record replaced in between is never touched.
#[async_trait::async_trait]
pub trait OtpStore: Send + Sync {
    /// Live, non-exhausted record for `email`.
    async fn get(&self, email: &Email) -> Result<Option<OtpRecord>, StoreError>;

    /// Overwrites any record for `record.email` and sets its TTL.
    /// Returns `true` when a live record was replaced.
    async fn replace(&self, record: &OtpRecord, ttl: Duration) -> Result<bool, StoreError>;

    /// Decrements the retry counter if the record still carries `expected`.
    /// A counter reaching zero removes the record. `None` when nothing matched.
    async fn record_failure(
        &self,
        email: &Email,
        expected: &OtpHash,
    ) -> Result<Option<u32>, StoreError>;

    /// Removes the record if it still carries `expected`.
    async fn consume(&self, email: &Email, expected: &OtpHash) -> Result<bool, StoreError>;
}

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("infra error: {0}")]
    Store(String),
    #[error("Internal error: {0}")]
    InternalError(#[from] anyhow::Error),
}
