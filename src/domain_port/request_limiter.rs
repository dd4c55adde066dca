use super::{StoreError, ThrottleDecision};
use std::time::Duration;

/// Fixed-window request budget keyed by an opaque caller key (an IP address).
#[async_trait::async_trait]
pub trait RequestLimiter: Send + Sync {
    /// Counts one request against `key` and reports whether it fits in
    /// `limit` requests per `window`.
    async fn hit(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<ThrottleDecision, StoreError>;
}
