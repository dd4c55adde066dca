mod http_mailer;
mod log_mailer;

pub use http_mailer::*;
pub use log_mailer::*;
