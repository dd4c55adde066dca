use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

const MAX_EMAIL_LEN: usize = 254;
const MAX_LOCAL_LEN: usize = 64;

// ASCII-only local part, dot-separated atoms; hostname-style domain with at least two labels.
static EMAIL_SHAPE: LazyLock<Option<Regex>> = LazyLock::new(|| {
    Regex::new(
        r"^[a-z0-9!#$%&'*+/=?^_`{|}~-]+(\.[a-z0-9!#$%&'*+/=?^_`{|}~-]+)*@[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?(\.[a-z0-9]([a-z0-9-]{0,61}[a-z0-9])?)+$",
    )
    .ok()
});

/// A structurally valid, case-normalized email address.
///
/// Used as the cache key for every piece of per-email OTP state.
#[derive(Debug, Clone, Ord, PartialOrd, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Email(String);

impl Email {
    /// Trims and lowercases `raw`, then checks its shape.
    pub fn parse(raw: &str) -> Option<Self> {
        let normalized = normalize_email(raw);
        if normalized.len() > MAX_EMAIL_LEN {
            return None;
        }
        let (local, _) = normalized.split_once('@')?;
        if local.len() > MAX_LOCAL_LEN {
            return None;
        }
        let shape = EMAIL_SHAPE.as_ref()?;
        shape.is_match(&normalized).then_some(Email(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn domain(&self) -> &str {
        self.0
            .rsplit_once('@')
            .map(|(_, domain)| domain)
            .unwrap_or_default()
    }
}

impl fmt::Display for Email {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

pub fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
