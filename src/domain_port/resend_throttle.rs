use super::StoreError;
use crate::domain_model::Email;
use std::time::Duration;

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum ThrottleDecision {
    Allowed,
    Throttled { retry_after: Duration },
}

/// Cooldown between OTP dispatches to the same address.
#[async_trait::async_trait]
pub trait ResendThrottle: Send + Sync {
    /// Time left on the active cooldown, if any.
    async fn remaining(&self, email: &Email) -> Result<Option<Duration>, StoreError>;

    /// Starts a cooldown unless one is already running. Check and set happen
    /// atomically; a `Throttled` answer leaves the existing cooldown alone.
    async fn record_resend_issued(
        &self,
        email: &Email,
        cooldown: Duration,
    ) -> Result<ThrottleDecision, StoreError>;

    /// Drops the cooldown for `email`.
    async fn release(&self, email: &Email) -> Result<(), StoreError>;

    async fn can_resend(&self, email: &Email) -> Result<bool, StoreError> {
        Ok(self.remaining(email).await?.is_none())
    }
}
