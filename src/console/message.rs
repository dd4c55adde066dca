use crate::application_port::AuthError;
use crate::logger::*;

pub const OTP_SENT: &str = "OTP generated and sent.";

/// Text shown to the person logging in. Store and internal details stay in the log.
pub fn user_message(err: &AuthError) -> String {
    match err {
        AuthError::InvalidEmail => "Email address is not allowed to log in.".to_string(),
        AuthError::Throttled { retry_after } => format!(
            "Please wait {}s before requesting another OTP.",
            retry_after.as_secs().max(1)
        ),
        AuthError::Dispatch(_) => "Could not send the OTP, please try again later.".to_string(),
        AuthError::InvalidOtp { attempts_remaining } => format!(
            "OTP hash verification failed, {} attempt(s) remaining.",
            attempts_remaining
        ),
        AuthError::NotFound => "OTP expired/not found.".to_string(),
        AuthError::Session(_) => "Login failed, please try again later.".to_string(),
        AuthError::Store(e) | AuthError::InternalError(e) => {
            warn!("Internal error: {}", e);
            "Login is temporarily unavailable.".to_string()
        }
    }
}

/// Whether the login prompt should stop after this error. A wrong or
/// missing code can be followed by another attempt or a resend.
pub fn ends_login(err: &AuthError) -> bool {
    !matches!(
        err,
        AuthError::InvalidOtp { .. } | AuthError::NotFound | AuthError::Throttled { .. }
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn verification_messages_match_login_screen() {
        assert_eq!(
            user_message(&AuthError::InvalidOtp {
                attempts_remaining: 2
            }),
            "OTP hash verification failed, 2 attempt(s) remaining."
        );
        assert_eq!(user_message(&AuthError::NotFound), "OTP expired/not found.");
    }

    #[test]
    fn throttle_message_rounds_up_to_one_second() {
        let msg = user_message(&AuthError::Throttled {
            retry_after: Duration::from_millis(300),
        });
        assert_eq!(msg, "Please wait 1s before requesting another OTP.");
        let msg = user_message(&AuthError::Throttled {
            retry_after: Duration::from_secs(17),
        });
        assert_eq!(msg, "Please wait 17s before requesting another OTP.");
    }

    #[test]
    fn internal_details_are_not_shown() {
        let msg = user_message(&AuthError::Store("redis://secret@host refused".into()));
        assert!(!msg.contains("redis"));
        let msg = user_message(&AuthError::Dispatch("smtp 550".into()));
        assert!(!msg.contains("550"));
    }

    #[test]
    fn only_code_errors_keep_the_prompt_open() {
        assert!(!ends_login(&AuthError::InvalidOtp {
            attempts_remaining: 0
        }));
        assert!(!ends_login(&AuthError::NotFound));
        assert!(!ends_login(&AuthError::Throttled {
            retry_after: Duration::from_secs(3)
        }));
        assert!(ends_login(&AuthError::InvalidEmail));
        assert!(ends_login(&AuthError::Dispatch("down".into())));
        assert!(ends_login(&AuthError::Session("db".into())));
        assert!(ends_login(&AuthError::Store("timeout".into())));
    }
}
