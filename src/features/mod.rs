pub mod access;
pub mod auth;
pub mod courses;
pub mod documents;
pub mod uploads;
pub mod users;
