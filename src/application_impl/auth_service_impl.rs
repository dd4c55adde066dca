use crate::application_port::*;
use crate::domain_model::*;
use crate::domain_port::*;
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, warn};

const IP_WINDOW: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct AuthConfig {
    pub otp_expiry: Duration,
    pub max_attempts: u32,
    pub resend_cooldown: Duration,
    /// Generate calls allowed per requester IP per minute; 0 disables the check.
    pub requests_per_minute_per_ip: u32,
    pub store_timeout: Duration,
    pub dispatch_timeout: Duration,
    pub login_message: Option<String>,
}

impl AuthConfig {
    /// Longest time a generate call can hold a cooldown claim before it
    /// releases it on failure: the claim, record write, dispatch and cleanup.
    pub fn claim_hold_limit(&self) -> Duration {
        self.store_timeout * 3 + self.dispatch_timeout
    }
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            otp_expiry: Duration::from_secs(5 * 60),
            max_attempts: 3,
            resend_cooldown: Duration::from_secs(20),
            requests_per_minute_per_ip: 0,
            store_timeout: Duration::from_secs(2),
            dispatch_timeout: Duration::from_secs(10),
            login_message: None,
        }
    }
}

pub struct RealAuthService {
    config: AuthConfig,
    validator: EmailDomainValidator,
    codec: Arc<dyn OtpCodec>,
    otp_store: Arc<dyn OtpStore>,
    throttle: Arc<dyn ResendThrottle>,
    limiter: Arc<dyn RequestLimiter>,
    mailer: Arc<dyn Mailer>,
    session_issuer: Arc<dyn SessionIssuer>,
}

impl RealAuthService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: AuthConfig,
        validator: EmailDomainValidator,
        codec: Arc<dyn OtpCodec>,
        otp_store: Arc<dyn OtpStore>,
        throttle: Arc<dyn ResendThrottle>,
        limiter: Arc<dyn RequestLimiter>,
        mailer: Arc<dyn Mailer>,
        session_issuer: Arc<dyn SessionIssuer>,
    ) -> Self {
        Self {
            config,
            validator,
            codec,
            otp_store,
            throttle,
            limiter,
            mailer,
            session_issuer,
        }
    }

    /// Runs a cache operation under `store_timeout`.
    async fn bounded<T, E>(&self, op: impl Future<Output = Result<T, E>>) -> Result<T, AuthError>
    where
        AuthError: From<E>,
    {
        match tokio::time::timeout(self.config.store_timeout, op).await {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => Err(AuthError::Store(format!(
                "store operation timed out after {:?}",
                self.config.store_timeout
            ))),
        }
    }

    fn validate_email(&self, raw: &str) -> Result<Email, AuthError> {
        Email::parse(raw)
            .filter(|email| self.validator.allows(email))
            .ok_or(AuthError::InvalidEmail)
    }

    async fn check_ip_budget(&self, requester_ip: Option<&str>) -> Result<(), AuthError> {
        let limit = self.config.requests_per_minute_per_ip;
        let Some(ip) = requester_ip.filter(|_| limit > 0) else {
            return Ok(());
        };
        match self.bounded(self.limiter.hit(ip, limit, IP_WINDOW)).await? {
            ThrottleDecision::Allowed => Ok(()),
            ThrottleDecision::Throttled { retry_after } => {
                debug!(%ip, ?retry_after, "otp request budget exhausted");
                Err(AuthError::Throttled { retry_after })
            }
        }
    }

    async fn issue_and_dispatch(&self, email: &Email) -> Result<OtpIssued, AuthError> {
        let (code, hashed_otp) = self.codec.generate()?;
        let now = Utc::now();
        let record = OtpRecord {
            email: email.clone(),
            hashed_otp,
            issued_at: now,
            expires_at: now + self.config.otp_expiry,
            retries_remaining: self.config.max_attempts,
        };

        let replaced = self
            .bounded(self.otp_store.replace(&record, self.config.otp_expiry))
            .await?;

        if let Err(err) = self.dispatch(email, &code).await {
            warn!(%email, error = %err, "otp dispatch failed, discarding record");
            if let Err(cleanup) = self
                .bounded(self.otp_store.consume(email, &record.hashed_otp))
                .await
            {
                warn!(%email, error = %cleanup, "failed to discard undelivered otp");
            }
            return Err(err);
        }

        Ok(OtpIssued {
            email: email.clone(),
            kind: if replaced {
                OtpIssueKind::Resend
            } else {
                OtpIssueKind::Fresh
            },
            expires_at: record.expires_at,
            resend_available_at: now + self.config.resend_cooldown,
        })
    }

    async fn dispatch(&self, email: &Email, code: &OtpCode) -> Result<(), AuthError> {
        match tokio::time::timeout(self.config.dispatch_timeout, self.mailer.send(email, code)).await
        {
            Ok(result) => result.map_err(AuthError::from),
            Err(_) => Err(AuthError::Dispatch(format!(
                "mailer timed out after {:?}",
                self.config.dispatch_timeout
            ))),
        }
    }

    async fn issue_session(&self, email: &Email) -> Result<Session, AuthError> {
        let issued =
            tokio::time::timeout(self.config.store_timeout, self.session_issuer.issue(email)).await;
        match issued {
            Ok(result) => result,
            Err(_) => {
                error!(%email, timeout = ?self.config.store_timeout, "session issuance timed out");
                Err(AuthError::Session(format!(
                    "session issuance timed out after {:?}",
                    self.config.store_timeout
                )))
            }
        }
    }
}

#[async_trait::async_trait]
impl AuthService for RealAuthService {
    async fn generate_otp(&self, request: GenerateOtpInput) -> Result<OtpIssued, AuthError> {
        let GenerateOtpInput {
            email,
            requester_ip,
        } = request;

        let email = self.validate_email(&email)?;
        // a running cooldown answers before the IP budget is charged
        if let Some(retry_after) = self.bounded(self.throttle.remaining(&email)).await? {
            debug!(%email, ?retry_after, "otp resend throttled");
            return Err(AuthError::Throttled { retry_after });
        }
        self.check_ip_budget(requester_ip.as_deref()).await?;

        match self
            .bounded(
                self.throttle
                    .record_resend_issued(&email, self.config.resend_cooldown),
            )
            .await?
        {
            ThrottleDecision::Allowed => {}
            ThrottleDecision::Throttled { retry_after } => {
                debug!(%email, ?retry_after, "otp resend throttled");
                return Err(AuthError::Throttled { retry_after });
            }
        }

        match self.issue_and_dispatch(&email).await {
            Ok(issued) => {
                info!(%email, ip = ?requester_ip, kind = ?issued.kind, "otp generated and sent");
                Ok(issued)
            }
            Err(err) => {
                if let Err(release) = self.bounded(self.throttle.release(&email)).await {
                    warn!(%email, error = %release, "failed to release resend cooldown");
                }
                Err(err)
            }
        }
    }

    async fn verify_otp(&self, request: VerifyOtpInput) -> Result<Session, AuthError> {
        let VerifyOtpInput { email, otp } = request;

        let email = Email::parse(&email).ok_or(AuthError::NotFound)?;
        let record = self
            .bounded(self.otp_store.get(&email))
            .await?
            .filter(OtpRecord::is_usable)
            .ok_or(AuthError::NotFound)?;

        if !self.codec.verify(&otp, &record.hashed_otp) {
            let left = self
                .bounded(self.otp_store.record_failure(&email, &record.hashed_otp))
                .await?;
            return match left {
                Some(attempts_remaining) => {
                    info!(%email, attempts_remaining, "login otp verification failed");
                    Err(AuthError::InvalidOtp { attempts_remaining })
                }
                None => Err(AuthError::NotFound),
            };
        }

        // single use: whoever removes the record wins
        if !self
            .bounded(self.otp_store.consume(&email, &record.hashed_otp))
            .await?
        {
            return Err(AuthError::NotFound);
        }

        let session = self.issue_session(&email).await?;
        info!(%email, user_id = %session.user.user_id, "login success");
        Ok(session)
    }

    async fn session(&self, id: &SessionId) -> Result<Option<Session>, AuthError> {
        match tokio::time::timeout(self.config.store_timeout, self.session_issuer.resolve(id)).await
        {
            Ok(result) => result,
            Err(_) => Err(AuthError::Session("session lookup timed out".to_string())),
        }
    }

    fn login_options(&self) -> LoginOptions {
        LoginOptions {
            email_domain_glob: self.validator.pattern().to_string(),
            login_message: self.config.login_message.clone(),
        }
    }
}
