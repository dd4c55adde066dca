mod auth_service_impl;
mod otp_codec_impl;
mod session_issuer_impl;

pub use auth_service_impl::*;
pub use otp_codec_impl::*;
pub use session_issuer_impl::*;
