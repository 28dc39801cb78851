use crate::core::error::{AppError, Result};
use crate::features::auth::dtos::{
    AuthTokensDto, LoginRequestDto, RefreshTokenRequestDto, RegisterRequestDto,
};
use crate::features::auth::jwt::JwtService;
use crate::features::auth::model::{Actor, Role, TokenKind};
use crate::features::auth::password::{hash_password, verify_password};
use crate::features::users::dtos::UserResponseDto;
use crate::features::users::models::{NewUser, User};
use crate::features::users::repositories::UserRepository;
use std::sync::Arc;

const INVALID_CREDENTIALS: &str = "Credentials are not valid";

/// Service for authentication operations and actor resolution
pub struct AuthService {
    users: Arc<dyn UserRepository>,
    jwt: Arc<JwtService>,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserRepository>, jwt: Arc<JwtService>) -> Self {
        Self { users, jwt }
    }

    /// Register a new student account
    pub async fn register(&self, dto: RegisterRequestDto) -> Result<UserResponseDto> {
        let password_hash = hash_password(&dto.password)?;

        let user = self
            .users
            .create(NewUser {
                email: normalize_email(&dto.email),
                full_name: dto.full_name.trim().to_string(),
                role: Role::Student,
                password_hash,
            })
            .await
            .map_err(|e| match e {
                AppError::Conflict(_) => {
                    AppError::Conflict("A user with this email already exists".to_string())
                }
                other => other,
            })?;

        tracing::info!("User registered: id={}", user.id);
        Ok(user.into())
    }

    /// Login with email and password.
    ///
    /// Unknown email, wrong password and inactive account all fail with the
    /// same message.
    pub async fn login(&self, dto: LoginRequestDto) -> Result<AuthTokensDto> {
        let user = self
            .users
            .find_by_email(&normalize_email(&dto.email))
            .await?
            .ok_or_else(invalid_credentials)?;

        if !user.is_active || !verify_password(&dto.password, &user.password_hash) {
            return Err(invalid_credentials());
        }

        self.issue_tokens(&user)
    }

    /// Exchange a refresh token for a new token pair
    pub async fn refresh(&self, dto: RefreshTokenRequestDto) -> Result<AuthTokensDto> {
        let user_id = self.jwt.validate(&dto.refresh_token, TokenKind::Refresh)?;
        let user = self.load_active_user(user_id).await?;
        self.issue_tokens(&user)
    }

    /// Resolve the acting user behind an access token.
    ///
    /// Fails with `Unauthorized` if the token is invalid or expired, the user
    /// no longer exists, or the account is inactive.
    pub async fn resolve_actor(&self, token: &str) -> Result<Actor> {
        let user_id = self.jwt.validate(token, TokenKind::Access)?;
        let user = self.load_active_user(user_id).await?;
        Ok(user.actor())
    }

    /// Current user's profile
    pub async fn me(&self, actor: &Actor) -> Result<UserResponseDto> {
        self.users
            .find_by_id(actor.id)
            .await?
            .map(UserResponseDto::from)
            .ok_or_else(|| AppError::NotFound("User not found".to_string()))
    }

    async fn load_active_user(&self, user_id: uuid::Uuid) -> Result<User> {
        match self.users.find_by_id(user_id).await? {
            Some(user) if user.is_active => Ok(user),
            Some(_) => Err(AppError::Unauthorized("Account is inactive".to_string())),
            None => Err(AppError::Unauthorized("Invalid or expired token".to_string())),
        }
    }

    fn issue_tokens(&self, user: &User) -> Result<AuthTokensDto> {
        let access = self.jwt.issue(user.id, TokenKind::Access)?;
        let refresh = self.jwt.issue(user.id, TokenKind::Refresh)?;

        Ok(AuthTokensDto {
            user_id: user.id,
            access_token: access.token,
            refresh_token: refresh.token,
            token_type: "Bearer".to_string(),
            expires_in: access.expires_in,
        })
    }
}

pub(crate) fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized(INVALID_CREDENTIALS.to_string())
}
