use crate::core::error::AppError;
use crate::features::auth::AuthService;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use base64::prelude::*;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::request_id::{MakeRequestId, RequestId};
use tracing::Span;
use uuid::Uuid;

/// Request ID generator using UUID v7 (time-ordered)
#[derive(Clone, Copy)]
pub struct MakeRequestUuid;

impl MakeRequestId for MakeRequestUuid {
    fn make_request_id<B>(&mut self, _request: &axum::http::Request<B>) -> Option<RequestId> {
        let id = Uuid::now_v7().to_string();
        HeaderValue::from_str(&id).ok().map(RequestId::new)
    }
}

/// Custom MakeSpan that includes request_id in the tracing span
#[derive(Clone, Debug)]
pub struct MakeSpanWithRequestId;

impl<B> tower_http::trace::MakeSpan<B> for MakeSpanWithRequestId {
    fn make_span(&mut self, request: &axum::http::Request<B>) -> Span {
        let request_id = request
            .headers()
            .get("x-request-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or("-");

        tracing::info_span!(
            "request",
            method = %request.method(),
            uri = %request.uri(),
            request_id = %request_id,
            user_id = tracing::field::Empty,
        )
    }
}

pub fn cors_layer(allowed_origins: Vec<String>) -> CorsLayer {
    let cors = CorsLayer::new().allow_methods(Any).allow_headers(Any);

    // If origins list contains "*", allow any origin
    if allowed_origins.iter().any(|o| o == "*") {
        cors.allow_origin(Any)
    } else {
        // Parse origins into HeaderValue
        let origins: Vec<HeaderValue> = allowed_origins
            .iter()
            .filter_map(|o| o.parse().ok())
            .collect();
        cors.allow_origin(AllowOrigin::list(origins))
    }
}

pub fn basic_auth_middleware(
    valid_credentials: Arc<String>,
) -> impl Fn(
    Request,
    Next,
)
    -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, Response>> + Send>>
       + Clone {
    move |req: Request, next: Next| {
        let credentials = valid_credentials.clone();
        Box::pin(async move {
            let auth_header = req
                .headers()
                .get(header::AUTHORIZATION)
                .and_then(|header| header.to_str().ok());

            if let Some(auth_header) = auth_header {
                if let Some(encoded) = auth_header.strip_prefix("Basic ") {
                    if let Ok(decoded) = BASE64_STANDARD.decode(encoded) {
                        if let Ok(creds) = String::from_utf8(decoded) {
                            if creds == *credentials {
                                return Ok(next.run(req).await);
                            }
                        }
                    }
                }
            }

            Err((
                StatusCode::UNAUTHORIZED,
                [(header::WWW_AUTHENTICATE, "Basic realm=\"Swagger UI\"")],
                "Unauthorized",
            )
                .into_response())
        })
    }
}

/// Resolve the bearer token into an `Actor` and attach it to the request.
///
/// Rejects missing, malformed, invalid or expired credentials and inactive
/// accounts before any handler runs.
pub async fn auth_middleware(
    State(auth): State<Arc<AuthService>>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&req)?;
    let actor = auth.resolve_actor(token).await?;

    tracing::Span::current().record("user_id", tracing::field::display(actor.id));
    req.extensions_mut().insert(actor);
    Ok(next.run(req).await)
}

fn bearer_token(req: &Request) -> Result<&str, AppError> {
    let auth_header = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Missing authorization header".to_string()))?;

    auth_header
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| AppError::Unauthorized("Invalid authorization header format".to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    fn request_with_auth(value: Option<&str>) -> Request {
        let mut builder = axum::http::Request::builder().uri("/api/documents");
        if let Some(value) = value {
            builder = builder.header(header::AUTHORIZATION, value);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn test_bearer_token_is_extracted() {
        let req = request_with_auth(Some("Bearer abc.def.ghi"));
        assert_eq!(bearer_token(&req).unwrap(), "abc.def.ghi");
    }

    #[test]
    fn test_missing_or_malformed_header_is_unauthorized() {
        for value in [None, Some("Basic abc"), Some("Bearer "), Some("abc")] {
            let req = request_with_auth(value);
            assert!(matches!(bearer_token(&req), Err(AppError::Unauthorized(_))));
        }
    }

    mod gate {
        use super::*;
        use crate::core::config::AuthConfig;
        use crate::features::auth::model::{Actor, Role, TokenKind};
        use crate::features::auth::JwtService;
        use crate::shared::test_helpers::InMemoryUserRepository;
        use axum::{routing::get, Router};
        use std::time::Duration;
        use tower::ServiceExt;

        async fn whoami(actor: Actor) -> String {
            actor.id.to_string()
        }

        fn app() -> (Router, Arc<JwtService>, Arc<InMemoryUserRepository>) {
            let jwt = Arc::new(JwtService::new(&AuthConfig {
                jwt_secret: "middleware-test-secret-long-enough".to_string(),
                access_token_ttl: Duration::from_secs(600),
                refresh_token_ttl: Duration::from_secs(3600),
                jwt_leeway: Duration::from_secs(0),
            }));
            let users = Arc::new(InMemoryUserRepository::default());
            let auth = Arc::new(AuthService::new(users.clone(), Arc::clone(&jwt)));

            let router = Router::new()
                .route("/whoami", get(whoami))
                .route_layer(axum::middleware::from_fn_with_state(auth, auth_middleware));
            (router, jwt, users)
        }

        fn get_whoami(token: Option<&str>) -> Request {
            let mut builder = axum::http::Request::builder().uri("/whoami");
            if let Some(token) = token {
                builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
            }
            builder.body(Body::empty()).unwrap()
        }

        #[tokio::test]
        async fn test_valid_token_reaches_handler_as_actor() {
            let (router, jwt, users) = app();
            let user = users.seed(Role::Student, "s1@school.test");
            let token = jwt.issue(user.id, TokenKind::Access).unwrap().token;

            let response = router.oneshot(get_whoami(Some(&token))).await.unwrap();

            assert_eq!(response.status(), StatusCode::OK);
            let body = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            assert_eq!(body, user.id.to_string());
        }

        #[tokio::test]
        async fn test_missing_token_is_rejected() {
            let (router, _, _) = app();
            let response = router.oneshot(get_whoami(None)).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        #[tokio::test]
        async fn test_inactive_user_is_rejected() {
            let (router, jwt, users) = app();
            let user = users.seed(Role::Teacher, "t1@school.test");
            users.set_active(user.id, false);
            let token = jwt.issue(user.id, TokenKind::Access).unwrap().token;

            let response = router.oneshot(get_whoami(Some(&token))).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }

        #[tokio::test]
        async fn test_refresh_token_is_not_accepted_as_access() {
            let (router, jwt, users) = app();
            let user = users.seed(Role::Admin, "a@school.test");
            let token = jwt.issue(user.id, TokenKind::Refresh).unwrap().token;

            let response = router.oneshot(get_whoami(Some(&token))).await.unwrap();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn test_cors_layer_accepts_wildcard_and_list() {
        let _ = cors_layer(vec!["*".to_string()]);
        let _ = cors_layer(vec!["http://localhost:5173".to_string()]);
    }
}
