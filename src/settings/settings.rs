use anyhow::{Result, anyhow};
use config::{Config, Environment, File};
use secrecy::SecretString;
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub log: Log,
    pub login: Login,
    pub mail: Mail,
    pub otp: Otp,
    pub session: Session,
    pub store: Store,
    pub user: User,
}

#[derive(Debug, Deserialize)]
pub struct Log {
    pub filter: String,
}

#[derive(Debug, Deserialize)]
pub struct Login {
    /// Glob the domain part of an email must match, e.g. `*.example.gov`.
    pub email_domain_glob: String,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct Mail {
    pub backend: String, // "http" or "log"
    pub sender: String,
    pub timeout_ms: u64,
    pub relay_url: Option<String>,
    pub relay_token: Option<SecretString>,
    /// Opt-in for the `log` backend, which writes plaintext codes to the log.
    #[serde(default)]
    pub log_plaintext_codes: bool,
}

#[derive(Debug, Deserialize)]
pub struct Otp {
    pub length: usize,
    pub expiry_secs: u64,
    pub max_attempts: u32,
    pub resend_cooldown_secs: u64,
    pub requests_per_minute_per_ip: u32,
    pub hmac_key: SecretString,
}

#[derive(Debug, Deserialize)]
pub struct Session {
    pub ttl_secs: u64,
}

#[derive(Debug, Deserialize)]
pub struct Store {
    pub backend: String, // "memory" or "redis"
    pub redis_dsn: Option<SecretString>,
    pub prefix: String,
    pub timeout_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct User {
    pub backend: String, // "memory" or "mysql"
    pub mysql_dsn: Option<SecretString>,
}

#[cfg(debug_assertions)]
const SETTINGS_PATH: &str = "settings/dev.toml";
#[cfg(not(debug_assertions))]
const SETTINGS_PATH: &str = "settings/release.toml";

/// Reads the settings file, then applies `OTPGATE__<SECTION>__<KEY>` overrides.
pub fn parse_settings(path: Option<&str>) -> Result<Settings> {
    let path = path.unwrap_or(SETTINGS_PATH);

    let settings: Settings = Config::builder()
        .add_source(File::with_name(path))
        .add_source(Environment::with_prefix("OTPGATE").separator("__"))
        .build()
        .map_err(|e| anyhow!(e))?
        .try_deserialize()
        .map_err(|e| anyhow!(e))?;

    Ok(settings)
}
