//! Auth gate: bearer token issuance, password login and actor resolution.

pub mod dtos;
pub mod handlers;
pub mod jwt;
pub mod model;
pub mod password;
pub mod routes;
pub mod services;

pub use jwt::JwtService;
pub use services::AuthService;
