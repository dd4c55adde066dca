use crate::domain_model::{Email, OtpCode};
use crate::domain_port::{Mailer, MailerError};
use anyhow::anyhow;
use reqwest::{Client, Url};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use tracing::{debug, warn};

const SUBJECT: &str = "Your one-time login code";

#[derive(Debug, Serialize)]
struct RelayMessage<'a> {
    from: &'a str,
    to: &'a str,
    subject: &'a str,
    text: String,
}

/// Hands each code to an HTTP mail relay as a JSON message, authenticated
/// with a bearer token. A 2xx answer means the relay accepted the message.
pub struct HttpMailer {
    client: Client,
    endpoint: Url,
    token: SecretString,
    sender: String,
}

impl HttpMailer {
    pub fn new(endpoint: &str, token: SecretString, sender: impl Into<String>) -> anyhow::Result<Self> {
        let endpoint = Url::parse(endpoint)?;
        if !matches!(endpoint.scheme(), "https" | "http") {
            return Err(anyhow!(
                "mail relay url must be http(s), got {}",
                endpoint.scheme()
            ));
        }
        let sender = sender.into();
        if sender.is_empty() {
            return Err(anyhow!("mail sender address is empty"));
        }
        Ok(Self {
            client: Client::builder().build()?,
            endpoint,
            token,
            sender,
        })
    }

    fn message<'a>(&'a self, to: &'a Email, code: &OtpCode) -> RelayMessage<'a> {
        RelayMessage {
            from: &self.sender,
            to: to.as_str(),
            subject: SUBJECT,
            text: format!(
                "Your login code is {}.\n\nIf you did not try to sign in, ignore this message.",
                code.expose()
            ),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, to: &Email, code: &OtpCode) -> Result<(), MailerError> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .bearer_auth(self.token.expose_secret())
            .json(&self.message(to, code))
            .send()
            .await
            .map_err(|e| MailerError::Unavailable(e.without_url().to_string()))?;

        let status = response.status();
        if status.is_success() {
            debug!(%to, "otp handed to mail relay");
            return Ok(());
        }
        warn!(%to, %status, "mail relay refused otp message");
        if status.is_server_error() {
            Err(MailerError::Unavailable(format!("relay answered {status}")))
        } else {
            Err(MailerError::Rejected(format!("relay answered {status}")))
        }
    }
}
