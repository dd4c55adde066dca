use super::Sweeper;
use crate::domain_port::{RequestLimiter, StoreError, ThrottleDecision};
use dashmap::DashMap;
use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug, Clone, Copy)]
struct Window {
    ends_at: Instant,
    count: u32,
}

#[derive(Debug, Default)]
pub struct MemoryRequestLimiter {
    windows: DashMap<String, Window>,
    sweeper: Sweeper,
}

impl MemoryRequestLimiter {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl RequestLimiter for MemoryRequestLimiter {
    async fn hit(
        &self,
        key: &str,
        limit: u32,
        window: Duration,
    ) -> Result<ThrottleDecision, StoreError> {
        let now = Instant::now();
        if self.sweeper.due() {
            self.windows.retain(|_, w| w.ends_at > now);
        }
        let current = *self
            .windows
            .entry(key.to_string())
            .and_modify(|w| {
                if w.ends_at <= now {
                    *w = Window {
                        ends_at: now + window,
                        count: 1,
                    };
                } else {
                    w.count = w.count.saturating_add(1);
                }
            })
            .or_insert(Window {
                ends_at: now + window,
                count: 1,
            });

        if current.count <= limit {
            Ok(ThrottleDecision::Allowed)
        } else {
            Ok(ThrottleDecision::Throttled {
                retry_after: current.ends_at.saturating_duration_since(now),
            })
        }
    }
}
