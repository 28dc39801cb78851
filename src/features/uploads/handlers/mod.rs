pub mod upload_handler;

pub use upload_handler::{__path_delete_image, __path_upload_image, delete_image, upload_image};
