use crate::domain_model::{Email, OtpCode, OtpHash, OtpIssueKind, Session, SessionId};
use crate::domain_port::{DirectoryError, MailerError, StoreError};
use chrono::{DateTime, Utc};
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email address")]
    InvalidEmail,
    #[error("otp requested too soon, retry in {}s", .retry_after.as_secs().max(1))]
    Throttled { retry_after: Duration },
    #[error("otp dispatch failed: {0}")]
    Dispatch(String),
    #[error("otp hash verification failed, {attempts_remaining} attempt(s) remaining")]
    InvalidOtp { attempts_remaining: u32 },
    #[error("otp expired or not found")]
    NotFound,
    #[error("session error: {0}")]
    Session(String),
    #[error("store error: {0}")]
    Store(String),
    #[error("internal error: {0}")]
    InternalError(String),
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Store(e) => AuthError::Store(e),
            StoreError::InternalError(e) => AuthError::InternalError(e.to_string()),
        }
    }
}

impl From<MailerError> for AuthError {
    fn from(err: MailerError) -> Self {
        AuthError::Dispatch(err.to_string())
    }
}

impl From<DirectoryError> for AuthError {
    fn from(err: DirectoryError) -> Self {
        AuthError::Session(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct GenerateOtpInput {
    pub email: String,
    pub requester_ip: Option<String>,
}

#[derive(Debug, Clone)]
pub struct VerifyOtpInput {
    pub email: String,
    pub otp: String,
}

#[derive(Debug, Clone)]
pub struct OtpIssued {
    pub email: Email,
    pub kind: OtpIssueKind,
    pub expires_at: DateTime<Utc>,
    pub resend_available_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct LoginOptions {
    pub email_domain_glob: String,
    pub login_message: Option<String>,
}

pub trait OtpCodec: Send + Sync {
    fn generate(&self) -> Result<(OtpCode, OtpHash), AuthError>;
    fn verify(&self, candidate: &str, stored: &OtpHash) -> bool;
}

#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    async fn generate_otp(&self, request: GenerateOtpInput) -> Result<OtpIssued, AuthError>;
    async fn verify_otp(&self, request: VerifyOtpInput) -> Result<Session, AuthError>;
    async fn session(&self, id: &SessionId) -> Result<Option<Session>, AuthError>;
    fn login_options(&self) -> LoginOptions;
}
