//! In-process adapters. State does not survive restarts and is not shared
//! between processes; used by the `memory` backends and by tests.

mod expiring;
mod otp_store_memory;
mod request_limiter_memory;
mod resend_throttle_memory;
mod session_store_memory;
mod user_directory_memory;

pub(crate) use expiring::*;
pub use otp_store_memory::*;
pub use request_limiter_memory::*;
pub use resend_throttle_memory::*;
pub use session_store_memory::*;
pub use user_directory_memory::*;
