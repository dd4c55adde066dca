//! Shared fixtures: memory backends plus scriptable collaborators.
#![allow(dead_code)]

use otpgate::application_impl::*;
use otpgate::application_port::*;
use otpgate::domain_model::*;
use otpgate::domain_port::*;
use otpgate::infra_memory::*;
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub const DOMAIN_GLOB: &str = "*.example.gov";
pub const EMAIL: &str = "a@x.example.gov";

/// Keeps every delivered code so tests can play the user's inbox.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(Email, String)>>,
}

impl RecordingMailer {
    pub fn last_code(&self) -> Option<String> {
        self.sent
            .lock()
            .expect("mailer lock")
            .last()
            .map(|(_, code)| code.clone())
    }

    pub fn sent_count(&self) -> usize {
        self.sent.lock().expect("mailer lock").len()
    }
}

#[async_trait::async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &Email, code: &OtpCode) -> Result<(), MailerError> {
        self.sent
            .lock()
            .expect("mailer lock")
            .push((to.clone(), code.expose().to_string()));
        Ok(())
    }
}

pub struct FailingMailer;

#[async_trait::async_trait]
impl Mailer for FailingMailer {
    async fn send(&self, _to: &Email, _code: &OtpCode) -> Result<(), MailerError> {
        Err(MailerError::Unavailable("connection refused".to_string()))
    }
}

/// Wraps the memory store and stalls every read.
pub struct StallingOtpStore {
    pub inner: MemoryOtpStore,
    pub delay: Duration,
}

#[async_trait::async_trait]
impl OtpStore for StallingOtpStore {
    async fn get(&self, email: &Email) -> Result<Option<OtpRecord>, StoreError> {
        tokio::time::sleep(self.delay).await;
        self.inner.get(email).await
    }

    async fn replace(&self, record: &OtpRecord, ttl: Duration) -> Result<bool, StoreError> {
        self.inner.replace(record, ttl).await
    }

    async fn record_failure(
        &self,
        email: &Email,
        expected: &OtpHash,
    ) -> Result<Option<u32>, StoreError> {
        self.inner.record_failure(email, expected).await
    }

    async fn consume(&self, email: &Email, expected: &OtpHash) -> Result<bool, StoreError> {
        self.inner.consume(email, expected).await
    }
}

pub struct BrokenDirectory;

#[async_trait::async_trait]
impl UserDirectory for BrokenDirectory {
    async fn find_or_create_by_email(
        &self,
        _email: &Email,
    ) -> Result<UserIdentity, DirectoryError> {
        Err(DirectoryError::Store("pool timed out".to_string()))
    }
}

/// Always issues `code`, hashed as `h:<code>`.
pub struct FixedCodec {
    pub code: &'static str,
}

impl OtpCodec for FixedCodec {
    fn generate(&self) -> Result<(OtpCode, OtpHash), AuthError> {
        Ok((
            OtpCode::new(self.code.to_string()),
            OtpHash(format!("h:{}", self.code)),
        ))
    }

    fn verify(&self, candidate: &str, stored: &OtpHash) -> bool {
        stored.0 == format!("h:{}", candidate.trim())
    }
}

pub fn config() -> AuthConfig {
    AuthConfig {
        otp_expiry: Duration::from_secs(300),
        max_attempts: 3,
        resend_cooldown: Duration::from_secs(20),
        requests_per_minute_per_ip: 0,
        store_timeout: Duration::from_secs(2),
        dispatch_timeout: Duration::from_secs(10),
        login_message: Some("Use your agency address.".to_string()),
    }
}

pub struct Harness {
    pub config: AuthConfig,
    pub codec: Arc<dyn OtpCodec>,
    pub otp_store: Arc<dyn OtpStore>,
    pub throttle: Arc<MemoryResendThrottle>,
    pub mailer: Arc<dyn Mailer>,
    pub directory: Arc<dyn UserDirectory>,
}

impl Harness {
    pub fn new(config: AuthConfig) -> Self {
        Self {
            config,
            codec: Arc::new(HmacOtpCodec::new(b"integration-key".to_vec(), 6).expect("codec")),
            otp_store: Arc::new(MemoryOtpStore::new()),
            throttle: Arc::new(MemoryResendThrottle::new()),
            mailer: Arc::new(RecordingMailer::default()),
            directory: Arc::new(MemoryUserDirectory::new()),
        }
    }

    pub fn build(&self) -> RealAuthService {
        let session_issuer = Arc::new(RealSessionIssuer::new(
            self.directory.clone(),
            Arc::new(MemorySessionStore::new()),
            Duration::from_secs(3600),
        ));
        RealAuthService::new(
            self.config.clone(),
            EmailDomainValidator::new(DOMAIN_GLOB).expect("pattern"),
            self.codec.clone(),
            self.otp_store.clone(),
            self.throttle.clone(),
            Arc::new(MemoryRequestLimiter::new()),
            self.mailer.clone(),
            session_issuer,
        )
    }
}

/// Harness with a recording mailer the test keeps a handle to.
pub fn recording() -> (Harness, Arc<RecordingMailer>) {
    let mut harness = Harness::new(config());
    let mailer = Arc::new(RecordingMailer::default());
    harness.mailer = mailer.clone();
    (harness, mailer)
}

pub fn generate(email: &str) -> GenerateOtpInput {
    GenerateOtpInput {
        email: email.to_string(),
        requester_ip: None,
    }
}

pub fn verify(email: &str, otp: &str) -> VerifyOtpInput {
    VerifyOtpInput {
        email: email.to_string(),
        otp: otp.to_string(),
    }
}

/// A same-length code that differs from `code` in every digit.
pub fn wrong_code(code: &str) -> String {
    code.bytes()
        .map(|b| char::from(b'0' + (b - b'0' + 1) % 10))
        .collect()
}
