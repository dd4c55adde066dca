// store

mod otp_store;
mod request_limiter;
mod resend_throttle;
mod session_store;

pub use otp_store::*;
pub use request_limiter::*;
pub use resend_throttle::*;
pub use session_store::*;

// collaborators

mod mailer;
mod user_directory;

pub use mailer::*;
pub use user_directory::*;
