pub mod document_handler;

pub use document_handler::{
    __path_delete_document, __path_get_document, __path_list_documents, __path_update_document,
    __path_upload_document, delete_document, get_document, list_documents, update_document,
    upload_document,
};
