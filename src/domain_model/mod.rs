mod email;
mod email_domain_validator;
mod otp;
mod session;
mod user;

pub use email::*;
pub use email_domain_validator::*;
pub use otp::*;
pub use session::*;
pub use user::*;
