use super::{Expiring, Sweeper};
use crate::domain_model::{Email, OtpHash, OtpRecord};
use crate::domain_port::{OtpStore, StoreError};
use dashmap::DashMap;
use std::time::Duration;

/// Process-local [`OtpStore`]. Shard locks give per-email atomicity.
#[derive(Debug, Default)]
pub struct MemoryOtpStore {
    records: DashMap<String, Expiring<OtpRecord>>,
    sweeper: Sweeper,
}

impl MemoryOtpStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn is_current(slot: &Expiring<OtpRecord>, expected: &OtpHash) -> bool {
        slot.is_live() && slot.value.is_usable() && slot.value.hashed_otp == *expected
    }
}

#[async_trait::async_trait]
impl OtpStore for MemoryOtpStore {
    async fn get(&self, email: &Email) -> Result<Option<OtpRecord>, StoreError> {
        let found = self
            .records
            .get(email.as_str())
            .filter(|slot| slot.is_live() && slot.value.is_usable())
            .map(|slot| slot.value.clone());
        if found.is_none() {
            self.records
                .remove_if(email.as_str(), |_, slot| !slot.is_live());
        }
        Ok(found)
    }

    async fn replace(&self, record: &OtpRecord, ttl: Duration) -> Result<bool, StoreError> {
        if self.sweeper.due() {
            self.records
                .retain(|_, slot| slot.is_live() && slot.value.is_usable());
        }
        let previous = self.records.insert(
            record.email.as_str().to_string(),
            Expiring::new(record.clone(), ttl),
        );
        Ok(previous.is_some_and(|slot| slot.is_live() && slot.value.is_usable()))
    }

    async fn record_failure(
        &self,
        email: &Email,
        expected: &OtpHash,
    ) -> Result<Option<u32>, StoreError> {
        let left = {
            let Some(mut slot) = self.records.get_mut(email.as_str()) else {
                return Ok(None);
            };
            if !Self::is_current(&slot, expected) {
                return Ok(None);
            }
            slot.value.retries_remaining -= 1;
            slot.value.retries_remaining
        };
        if left == 0 {
            self.records.remove_if(email.as_str(), |_, slot| {
                slot.value.hashed_otp == *expected && !slot.value.is_usable()
            });
        }
        Ok(Some(left))
    }

    async fn consume(&self, email: &Email, expected: &OtpHash) -> Result<bool, StoreError> {
        Ok(self
            .records
            .remove_if(email.as_str(), |_, slot| Self::is_current(slot, expected))
            .is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn record(email: &str, hash: &str, retries: u32) -> OtpRecord {
        let now = Utc::now();
        OtpRecord {
            email: Email::parse(email).expect("valid email"),
            hashed_otp: OtpHash(hash.to_string()),
            issued_at: now,
            expires_at: now + Duration::from_secs(300),
            retries_remaining: retries,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn record_expires_with_ttl() {
        let store = MemoryOtpStore::new();
        let rec = record("a@x.example.gov", "h1", 3);
        store.replace(&rec, Duration::from_secs(300)).await.unwrap();
        assert!(store.get(&rec.email).await.unwrap().is_some());

        tokio::time::advance(Duration::from_secs(301)).await;
        assert!(store.get(&rec.email).await.unwrap().is_none());
        assert!(!store.consume(&rec.email, &rec.hashed_otp).await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn abandoned_records_are_pruned() {
        let store = MemoryOtpStore::new();
        for i in 0..500 {
            let rec = record(&format!("u{i}@x.example.gov"), "h", 3);
            store.replace(&rec, Duration::from_secs(300)).await.unwrap();
        }
        assert_eq!(store.records.len(), 500);

        tokio::time::advance(Duration::from_secs(3600)).await;
        let rec = record("a@x.example.gov", "h1", 3);
        store.replace(&rec, Duration::from_secs(300)).await.unwrap();
        assert_eq!(store.records.len(), 1);
    }

    #[tokio::test]
    async fn replace_reports_live_predecessor() {
        let store = MemoryOtpStore::new();
        let first = record("a@x.example.gov", "h1", 3);
        let second = record("a@x.example.gov", "h2", 3);
        assert!(!store.replace(&first, Duration::from_secs(60)).await.unwrap());
        assert!(store.replace(&second, Duration::from_secs(60)).await.unwrap());

        let current = store.get(&first.email).await.unwrap().unwrap();
        assert_eq!(current.hashed_otp, second.hashed_otp);
    }

    #[tokio::test]
    async fn failures_count_down_and_remove_at_zero() {
        let store = MemoryOtpStore::new();
        let rec = record("a@x.example.gov", "h1", 2);
        store.replace(&rec, Duration::from_secs(60)).await.unwrap();

        let left = store.record_failure(&rec.email, &rec.hashed_otp).await.unwrap();
        assert_eq!(left, Some(1));
        let left = store.record_failure(&rec.email, &rec.hashed_otp).await.unwrap();
        assert_eq!(left, Some(0));

        assert!(store.get(&rec.email).await.unwrap().is_none());
        let left = store.record_failure(&rec.email, &rec.hashed_otp).await.unwrap();
        assert_eq!(left, None);
    }

    #[tokio::test]
    async fn stale_hash_does_not_touch_newer_record() {
        let store = MemoryOtpStore::new();
        let old = record("a@x.example.gov", "old", 3);
        let new = record("a@x.example.gov", "new", 3);
        store.replace(&old, Duration::from_secs(60)).await.unwrap();
        store.replace(&new, Duration::from_secs(60)).await.unwrap();

        assert_eq!(
            store.record_failure(&old.email, &old.hashed_otp).await.unwrap(),
            None
        );
        assert!(!store.consume(&old.email, &old.hashed_otp).await.unwrap());

        let current = store.get(&new.email).await.unwrap().unwrap();
        assert_eq!(current.retries_remaining, 3);
    }

    #[tokio::test]
    async fn consume_is_single_use() {
        let store = MemoryOtpStore::new();
        let rec = record("a@x.example.gov", "h1", 3);
        store.replace(&rec, Duration::from_secs(60)).await.unwrap();

        assert!(store.consume(&rec.email, &rec.hashed_otp).await.unwrap());
        assert!(!store.consume(&rec.email, &rec.hashed_otp).await.unwrap());
        assert!(store.get(&rec.email).await.unwrap().is_none());
    }
}
