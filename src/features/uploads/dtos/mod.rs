mod upload_dto;

pub use upload_dto::{DeleteImageDto, ImageUploadDto, UploadImageDto};
