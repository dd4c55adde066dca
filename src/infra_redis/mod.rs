mod otp_store_redis;
mod request_limiter_redis;
mod resend_throttle_redis;
mod session_store_redis;

pub use otp_store_redis::*;
pub use request_limiter_redis::*;
pub use resend_throttle_redis::*;
pub use session_store_redis::*;
