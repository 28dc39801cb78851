mod document_dto;

pub use document_dto::{DocumentCourseDto, DocumentResponseDto, UpdateDocumentDto, UploadDocumentDto};
