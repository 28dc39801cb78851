mod user_dto;

pub use user_dto::{CreateTeacherDto, SearchUserQuery, UpdateUserDto, UserResponseDto, UserSummaryDto};
