//! User accounts and their administration.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Roles |
//! |--------|----------|-------|
//! | GET | `/api/users` | ADMIN, TEACHER |
//! | GET | `/api/users/search?email=` | ADMIN, TEACHER |
//! | POST | `/api/users/teachers` | ADMIN |
//! | GET | `/api/users/teachers` | ADMIN |
//! | GET | `/api/users/{id}` | self, ADMIN, TEACHER |
//! | PATCH | `/api/users/{id}` | self, ADMIN |
//! | DELETE | `/api/users/{id}` | ADMIN |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::{PgUserRepository, UserRepository};
pub use services::UserService;
