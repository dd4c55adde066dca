use crate::domain_model::{Email, OtpCode};

#[async_trait::async_trait]
pub trait Mailer: Send + Sync {
    /// Delivers `code` to `to`. `Ok` means the message was accepted for delivery.
    async fn send(&self, to: &Email, code: &OtpCode) -> Result<(), MailerError>;
}

#[derive(Debug, thiserror::Error)]
pub enum MailerError {
    #[error("mail transport rejected message: {0}")]
    Rejected(String),
    #[error("mail transport unavailable: {0}")]
    Unavailable(String),
}
