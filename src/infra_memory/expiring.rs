use std::sync::Mutex;
use std::time::Duration;
use tokio::time::Instant;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// A value with a deadline on the tokio clock.
#[derive(Debug, Clone)]
pub(crate) struct Expiring<T> {
    pub value: T,
    pub deadline: Instant,
}

impl<T> Expiring<T> {
    pub fn new(value: T, ttl: Duration) -> Self {
        Self {
            value,
            deadline: Instant::now() + ttl,
        }
    }

    pub fn is_live(&self) -> bool {
        Instant::now() < self.deadline
    }
}

/// Rate gate for pruning expired map entries from the write path.
///
/// `due` answers `true` at most once per interval; a writer that loses the
/// race for the lock skips the sweep.
#[derive(Debug)]
pub(crate) struct Sweeper {
    interval: Duration,
    next: Mutex<Instant>,
}

impl Sweeper {
    pub fn new(interval: Duration) -> Self {
        Self {
            interval,
            next: Mutex::new(Instant::now() + interval),
        }
    }

    pub fn due(&self) -> bool {
        let Ok(mut next) = self.next.try_lock() else {
            return false;
        };
        let now = Instant::now();
        if now < *next {
            return false;
        }
        *next = now + self.interval;
        true
    }
}

impl Default for Sweeper {
    fn default() -> Self {
        Self::new(SWEEP_INTERVAL)
    }
}
