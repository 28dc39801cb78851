mod auth_service;

pub(crate) use auth_service::normalize_email;
pub use auth_service::AuthService;
