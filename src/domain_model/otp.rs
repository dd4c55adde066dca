use super::Email;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use std::fmt;

/// Plaintext one-time password. Lives only between generation and dispatch.
#[derive(Debug, Clone)]
pub struct OtpCode(SecretString);

impl OtpCode {
    pub fn new(code: String) -> Self {
        OtpCode(SecretString::from(code))
    }

    pub fn expose(&self) -> &str {
        self.0.expose_secret()
    }
}

/// Hex-encoded keyed digest of an [`OtpCode`].
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct OtpHash(pub String);

impl fmt::Display for OtpHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub email: Email,
    pub hashed_otp: OtpHash,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub retries_remaining: u32,
}

impl OtpRecord {
    /// Exhausted records are treated as absent.
    pub fn is_usable(&self) -> bool {
        self.retries_remaining > 0
    }
}

#[derive(Debug, Clone, Copy, Eq, PartialEq)]
pub enum OtpIssueKind {
    /// No live code existed for the address.
    Fresh,
    /// A live code was replaced.
    Resend,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn code_debug_output_is_redacted() {
        let code = OtpCode::new("482913".to_string());
        assert_eq!(code.expose(), "482913");
        assert!(!format!("{code:?}").contains("482913"));
    }
}
