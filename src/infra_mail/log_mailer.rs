use crate::domain_model::{Email, OtpCode};
use crate::domain_port::{Mailer, MailerError};
use tracing::warn;

/// Development mailer: writes the code to the log instead of sending mail.
///
/// The plaintext code ends up in logs, so the server only builds this
/// mailer when `mail.log_plaintext_codes` is set.
#[derive(Debug, Clone)]
pub struct LogMailer {
    sender: String,
}

impl LogMailer {
    pub fn new(sender: impl Into<String>) -> Self {
        LogMailer {
            sender: sender.into(),
        }
    }
}

#[async_trait::async_trait]
impl Mailer for LogMailer {
    async fn send(&self, to: &Email, code: &OtpCode) -> Result<(), MailerError> {
        if self.sender.is_empty() {
            return Err(MailerError::Rejected("sender address is empty".to_string()));
        }
        warn!(
            from = %self.sender,
            %to,
            otp = code.expose(),
            "log mailer: one-time password not sent, printed here instead"
        );
        Ok(())
    }
}
