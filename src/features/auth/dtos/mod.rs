mod auth_dto;

pub use auth_dto::{AuthTokensDto, LoginRequestDto, RefreshTokenRequestDto, RegisterRequestDto};
