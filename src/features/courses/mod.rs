//! Courses, enrolments and course files.

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::{CourseRepository, PgCourseRepository};
pub use services::CourseService;
