use crate::application_impl::*;
use crate::application_port::*;
use crate::domain_model::EmailDomainValidator;
use crate::domain_port::*;
use crate::infra_mail::*;
use crate::infra_memory::*;
use crate::infra_mysql::*;
use crate::infra_redis::*;
use crate::logger::*;
use crate::settings::{Mail, Settings};
use anyhow::{anyhow, ensure};
use secrecy::ExposeSecret;
use sqlx::{MySql, Pool};
use std::sync::Arc;
use std::time::Duration;

struct CacheBackends {
    otp_store: Arc<dyn OtpStore>,
    throttle: Arc<dyn ResendThrottle>,
    limiter: Arc<dyn RequestLimiter>,
    session_store: Arc<dyn SessionStore>,
}

pub struct Server {
    pub auth_service: Arc<dyn AuthService>,
    pool: Option<Pool<MySql>>,
}

impl Server {
    pub async fn try_new(settings: &Settings) -> anyhow::Result<Self> {
        let mailer = select_mailer(&settings.mail)?;
        Self::try_new_with_mailer(settings, mailer).await
    }

    /// Wires every backend from `settings` except mail delivery.
    pub async fn try_new_with_mailer(
        settings: &Settings,
        mailer: Arc<dyn Mailer>,
    ) -> anyhow::Result<Self> {
        ensure!(settings.otp.max_attempts > 0, "otp.max_attempts must be positive");
        ensure!(settings.otp.expiry_secs > 0, "otp.expiry_secs must be positive");

        let validator = EmailDomainValidator::new(&settings.login.email_domain_glob)?;
        let codec: Arc<dyn OtpCodec> = Arc::new(HmacOtpCodec::new(
            settings.otp.hmac_key.expose_secret().as_bytes().to_vec(),
            settings.otp.length,
        )?);

        let caches = match settings.store.backend.as_str() {
            "memory" => CacheBackends {
                otp_store: Arc::new(MemoryOtpStore::new()),
                throttle: Arc::new(MemoryResendThrottle::new()),
                limiter: Arc::new(MemoryRequestLimiter::new()),
                session_store: Arc::new(MemorySessionStore::new()),
            },
            "redis" => {
                let dsn = settings
                    .store
                    .redis_dsn
                    .as_ref()
                    .ok_or_else(|| anyhow!("store.redis_dsn is required for the redis backend"))?;
                let redis_client = redis::Client::open(dsn.expose_secret())?;
                let redis_manager = redis_client.get_connection_manager().await?;
                let prefix = settings.store.prefix.clone();
                CacheBackends {
                    otp_store: Arc::new(RedisOtpStore::new(redis_manager.clone(), prefix.clone())),
                    throttle: Arc::new(RedisResendThrottle::new(
                        redis_manager.clone(),
                        prefix.clone(),
                    )),
                    limiter: Arc::new(RedisRequestLimiter::new(
                        redis_manager.clone(),
                        prefix.clone(),
                    )),
                    session_store: Arc::new(RedisSessionStore::new(redis_manager, prefix)),
                }
            }
            other => return Err(anyhow!("Unknown store backend: {}", other)),
        };

        let (user_directory, pool): (Arc<dyn UserDirectory>, Option<Pool<MySql>>) =
            match settings.user.backend.as_str() {
                "memory" => (Arc::new(MemoryUserDirectory::new()), None),
                "mysql" => {
                    let dsn = settings
                        .user
                        .mysql_dsn
                        .as_ref()
                        .ok_or_else(|| anyhow!("user.mysql_dsn is required for the mysql backend"))?;
                    let pool = Pool::<MySql>::connect(dsn.expose_secret()).await?;
                    (Arc::new(MySqlUserDirectory::new(pool.clone())), Some(pool))
                }
                other => return Err(anyhow!("Unknown user backend: {}", other)),
            };

        let session_issuer: Arc<dyn SessionIssuer> = Arc::new(RealSessionIssuer::new(
            user_directory,
            caches.session_store,
            Duration::from_secs(settings.session.ttl_secs),
        ));

        let config = AuthConfig {
            otp_expiry: Duration::from_secs(settings.otp.expiry_secs),
            max_attempts: settings.otp.max_attempts,
            resend_cooldown: Duration::from_secs(settings.otp.resend_cooldown_secs),
            requests_per_minute_per_ip: settings.otp.requests_per_minute_per_ip,
            store_timeout: Duration::from_millis(settings.store.timeout_ms),
            dispatch_timeout: Duration::from_millis(settings.mail.timeout_ms),
            login_message: settings.login.message.clone(),
        };
        ensure!(
            config.resend_cooldown > config.claim_hold_limit(),
            "otp.resend_cooldown_secs ({:?}) must exceed three store timeouts plus the mail timeout ({:?})",
            config.resend_cooldown,
            config.claim_hold_limit()
        );
        debug!(?config);

        let auth_service: Arc<dyn AuthService> = Arc::new(RealAuthService::new(
            config,
            validator,
            codec,
            caches.otp_store,
            caches.throttle,
            caches.limiter,
            mailer,
            session_issuer,
        ));

        info!(
            store = %settings.store.backend,
            user = %settings.user.backend,
            "server started"
        );

        Ok(Self { auth_service, pool })
    }

    pub async fn shutdown(&self) {
        info!("server shutting down...");
        if let Some(pool) = &self.pool {
            pool.close().await;
        }
    }
}

/// Picks the mail transport. The `log` backend needs an explicit opt-in.
pub fn select_mailer(mail: &Mail) -> anyhow::Result<Arc<dyn Mailer>> {
    match mail.backend.as_str() {
        "http" => {
            let url = mail
                .relay_url
                .as_deref()
                .ok_or_else(|| anyhow!("mail.relay_url is required for the http backend"))?;
            let token = mail
                .relay_token
                .clone()
                .ok_or_else(|| anyhow!("mail.relay_token is required for the http backend"))?;
            Ok(Arc::new(HttpMailer::new(url, token, mail.sender.clone())?))
        }
        "log" => {
            ensure!(
                mail.log_plaintext_codes,
                "mail.backend = \"log\" writes one-time passwords to the log; \
                 set mail.log_plaintext_codes = true to allow it"
            );
            warn!("log mailer selected: one-time passwords are written to the log");
            Ok(Arc::new(LogMailer::new(mail.sender.clone())))
        }
        other => Err(anyhow!("Unknown mail backend: {}", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::settings::parse_settings;
    use secrecy::SecretString;

    fn dev() -> Settings {
        parse_settings(Some(concat!(env!("CARGO_MANIFEST_DIR"), "/settings/dev.toml"))).unwrap()
    }

    fn release() -> Settings {
        parse_settings(Some(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/settings/release.toml"
        )))
        .unwrap()
    }

    #[test]
    fn log_mailer_requires_opt_in() {
        let mut settings = dev();
        assert!(select_mailer(&settings.mail).is_ok());

        settings.mail.log_plaintext_codes = false;
        let err = select_mailer(&settings.mail).err().unwrap();
        assert!(err.to_string().contains("log_plaintext_codes"));
    }

    #[test]
    fn release_mail_needs_a_relay() {
        let mut settings = release();
        assert!(select_mailer(&settings.mail).is_err());

        settings.mail.relay_url = Some("https://relay.example.gov/send".to_string());
        settings.mail.relay_token = Some(SecretString::from("token".to_string()));
        assert!(select_mailer(&settings.mail).is_ok());
    }

    #[test]
    fn release_mail_cannot_fall_back_to_log() {
        let mut settings = release();
        settings.mail.backend = "log".to_string();
        assert!(select_mailer(&settings.mail).is_err());
    }

    #[test]
    fn unknown_mail_backend_is_rejected() {
        let mut settings = dev();
        settings.mail.backend = "smtp".to_string();
        assert!(select_mailer(&settings.mail).is_err());
    }

    #[tokio::test]
    async fn dev_settings_build_a_server() {
        let server = Server::try_new(&dev()).await.unwrap();
        assert_eq!(
            server.auth_service.login_options().email_domain_glob,
            "*.example.gov"
        );
        server.shutdown().await;
    }

    #[tokio::test]
    async fn cooldown_shorter_than_a_generate_call_is_rejected() {
        let mut settings = dev();
        settings.otp.resend_cooldown_secs = 5;
        let err = Server::try_new(&settings).await.err().unwrap();
        assert!(err.to_string().contains("resend_cooldown_secs"));
    }
}
