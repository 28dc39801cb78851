mod deletion;
mod document_service;
mod ingestion;

pub use deletion::DeletionCoordinator;
pub use document_service::DocumentService;
pub use ingestion::{IngestRequest, IngestionPipeline};
