mod auth_service;
mod session_issuer;

pub use auth_service::*;
pub use session_issuer::*;
