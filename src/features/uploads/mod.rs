//! Image uploads that live only in the blob store.

pub mod dtos;
pub mod handlers;
pub mod routes;
pub mod services;

pub use services::UploadService;
