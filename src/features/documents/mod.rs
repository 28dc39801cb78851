//! Uploaded documents: ingestion, access-checked reads and updates, and
//! deletion.
//!
//! ## Endpoints
//!
//! | Method | Endpoint | Description |
//! |--------|----------|-------------|
//! | POST | `/api/documents/upload` | Upload a document (multipart) |
//! | GET | `/api/documents` | List the caller's documents |
//! | GET | `/api/documents/{id}` | Get a document |
//! | PATCH | `/api/documents/{id}` | Update name, description or course |
//! | DELETE | `/api/documents/{id}` | Delete a document and its file |

pub mod dtos;
pub mod handlers;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;

pub use repositories::{DocumentRepository, PgDocumentRepository};
pub use services::DocumentService;
