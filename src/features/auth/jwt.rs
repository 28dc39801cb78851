use super::model::{Claims, TokenKind};
use crate::core::config::AuthConfig;
use crate::core::error::AppError;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use std::time::Duration;
use uuid::Uuid;

/// Issues and validates HS256 bearer tokens whose subject is a user id
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    access_ttl: Duration,
    refresh_ttl: Duration,
    leeway: u64,
}

/// A freshly signed token and its lifetime
#[derive(Debug, Clone)]
pub struct IssuedToken {
    pub token: String,
    pub expires_in: i64,
}

impl JwtService {
    pub fn new(config: &AuthConfig) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            access_ttl: config.access_token_ttl,
            refresh_ttl: config.refresh_token_ttl,
            leeway: config.jwt_leeway.as_secs(),
        }
    }

    pub fn issue(&self, user_id: Uuid, kind: TokenKind) -> Result<IssuedToken, AppError> {
        let ttl = match kind {
            TokenKind::Access => self.access_ttl,
            TokenKind::Refresh => self.refresh_ttl,
        };
        let now = Utc::now().timestamp().max(0) as u64;

        let claims = Claims {
            sub: user_id,
            iat: now,
            exp: now + ttl.as_secs(),
            kind,
        };

        let token = encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
            .map_err(|e| AppError::Internal(format!("Failed to sign token: {}", e)))?;

        Ok(IssuedToken {
            token,
            expires_in: ttl.as_secs() as i64,
        })
    }

    /// Validate signature, expiry and token kind; returns the user id
    pub fn validate(&self, token: &str, expected: TokenKind) -> Result<Uuid, AppError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = self.leeway;
        validation.set_required_spec_claims(&["exp", "sub"]);

        let data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            tracing::debug!("Rejected bearer token: {}", e);
            AppError::Unauthorized("Invalid or expired token".to_string())
        })?;

        if data.claims.kind != expected {
            return Err(AppError::Unauthorized("Invalid token type".to_string()));
        }

        Ok(data.claims.sub)
    }
}
