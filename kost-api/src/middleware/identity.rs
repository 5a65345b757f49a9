//! Axum middleware that establishes who is calling.
//!
//! - no `X-API-Key` header: the request continues as [`Requester::Anonymous`]
//! - unknown key: 401 before the handler runs, on every route including the
//!   open reads; a key that is sent is always checked
//! - known key: the bound [`Requester`] is injected into request extensions
//!
//! Whether the requester may perform an operation is decided later by the
//! service's [`Authorizer`](crate::auth::Authorizer).

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::request::Parts,
    middleware::Next,
    response::{IntoResponse, Response},
};
use kost_core::Requester;

use crate::auth::AuthConfig;
use crate::error::ApiError;

pub const API_KEY_HEADER: &str = "x-api-key";

/// Shared state for the identity middleware.
#[derive(Debug, Clone)]
pub struct IdentityState {
    pub auth_config: Arc<AuthConfig>,
}

impl IdentityState {
    pub fn new(auth_config: AuthConfig) -> Self {
        Self {
            auth_config: Arc::new(auth_config),
        }
    }
}

/// Resolve the API key, if any, and attach the requester to the request.
///
/// ```ignore
/// let state = IdentityState::new(AuthConfig::from_env()?);
/// let app = Router::new()
///     .route("/properties/:id/availability", put(update_availability))
///     .layer(middleware::from_fn_with_state(state, identity_middleware));
/// ```
pub async fn identity_middleware(
    State(state): State<IdentityState>,
    mut request: Request,
    next: Next,
) -> Result<Response, IdentityMiddlewareError> {
    let api_key = request
        .headers()
        .get(API_KEY_HEADER)
        .map(|value| value.to_str().map(str::trim));

    let requester = match api_key {
        None => Requester::Anonymous,
        Some(Err(_)) => {
            return Err(IdentityMiddlewareError(ApiError::invalid_input(
                "X-API-Key header must be visible ASCII",
            )))
        }
        Some(Ok(key)) => state.auth_config.resolve(key).ok_or_else(|| {
            tracing::debug!("Rejected request with unknown API key");
            IdentityMiddlewareError(ApiError::invalid_api_key())
        })?,
    };

    request.extensions_mut().insert(requester);
    Ok(next.run(request).await)
}

/// Error wrapper for middleware that implements IntoResponse.
#[derive(Debug)]
pub struct IdentityMiddlewareError(pub ApiError);

impl IntoResponse for IdentityMiddlewareError {
    fn into_response(self) -> Response {
        self.0.into_response()
    }
}

/// Typed extractor for the requester injected by [`identity_middleware`].
///
/// Routes mounted without the middleware see an anonymous requester, so a
/// missing layer can never grant privileges.
#[derive(Debug, Clone)]
pub struct RequesterExtractor(pub Requester);

#[axum::async_trait]
impl<S> FromRequestParts<S> for RequesterExtractor
where
    S: Send + Sync,
{
    type Rejection = IdentityMiddlewareError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequesterExtractor(
            parts
                .extensions
                .get::<Requester>()
                .cloned()
                .unwrap_or(Requester::Anonymous),
        ))
    }
}

impl std::ops::Deref for RequesterExtractor {
    type Target = Requester;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware::from_fn_with_state,
        routing::get,
        Router,
    };
    use kost_core::Role;
    use tower::ServiceExt;

    async fn whoami(RequesterExtractor(requester): RequesterExtractor) -> String {
        match requester {
            Requester::Anonymous => "anonymous".to_string(),
            Requester::Authenticated { subject, role } => format!("{}:{}", subject, role),
        }
    }

    fn app() -> Router {
        let auth = AuthConfig::default().with_api_key("secret", "ops", Role::Owner);
        Router::new()
            .route("/whoami", get(whoami))
            .layer(from_fn_with_state(IdentityState::new(auth), identity_middleware))
    }

    async fn body_text(response: Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    #[tokio::test]
    async fn test_missing_key_is_anonymous() {
        let response = app()
            .oneshot(HttpRequest::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "anonymous");
    }

    #[tokio::test]
    async fn test_known_key_resolves_requester() {
        let response = app()
            .oneshot(
                HttpRequest::get("/whoami")
                    .header(API_KEY_HEADER, "secret")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_text(response).await, "ops:owner");
    }

    #[tokio::test]
    async fn test_unknown_key_is_rejected() {
        let response = app()
            .oneshot(
                HttpRequest::get("/whoami")
                    .header(API_KEY_HEADER, "guess")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert!(body_text(response).await.contains("INVALID_API_KEY"));
    }

    #[tokio::test]
    async fn test_extractor_defaults_to_anonymous_without_layer() {
        let app = Router::new().route("/whoami", get(whoami));
        let response = app
            .oneshot(HttpRequest::get("/whoami").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(body_text(response).await, "anonymous");
    }
}
