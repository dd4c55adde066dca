use super::Sweeper;
use crate::domain_model::Email;
use crate::domain_port::{ResendThrottle, StoreError, ThrottleDecision};
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Default)]
pub struct MemoryResendThrottle {
    cooldowns: DashMap<String, Instant>,
    sweeper: Sweeper,
}

impl MemoryResendThrottle {
    pub fn new() -> Self {
        Self::default()
    }

    fn prune(&self, now: Instant) {
        if self.sweeper.due() {
            self.cooldowns.retain(|_, deadline| *deadline > now);
        }
    }
}

#[async_trait::async_trait]
impl ResendThrottle for MemoryResendThrottle {
    async fn remaining(&self, email: &Email) -> Result<Option<Duration>, StoreError> {
        let now = Instant::now();
        Ok(self
            .cooldowns
            .get(email.as_str())
            .map(|deadline| deadline.saturating_duration_since(now))
            .filter(|left| !left.is_zero()))
    }

    async fn record_resend_issued(
        &self,
        email: &Email,
        cooldown: Duration,
    ) -> Result<ThrottleDecision, StoreError> {
        let now = Instant::now();
        self.prune(now);
        let mut claimed = false;
        let deadline = *self
            .cooldowns
            .entry(email.as_str().to_string())
            .and_modify(|deadline| {
                if *deadline <= now {
                    *deadline = now + cooldown;
                    claimed = true;
                }
            })
            .or_insert_with(|| {
                claimed = true;
                now + cooldown
            });

        if claimed {
            Ok(ThrottleDecision::Allowed)
        } else {
            Ok(ThrottleDecision::Throttled {
                retry_after: deadline.saturating_duration_since(now),
            })
        }
    }

    async fn release(&self, email: &Email) -> Result<(), StoreError> {
        self.cooldowns.remove(email.as_str());
        Ok(())
    }
}
