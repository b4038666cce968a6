use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};

use crate::auth::{validate_jwt, Identity};
use crate::handlers::AppState;

/// Attach the caller's [`Identity`] to the request when a valid JWT is
/// presented. Never rejects: access decisions belong to the action gate.
pub async fn identity_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Response {
    let security = &state.services.config.security;

    if let Some(token) = extract_token(request.headers(), &security.session_cookie) {
        match validate_jwt(security, &token) {
            Ok(claims) => {
                let identity = Identity::from(claims);
                tracing::debug!("Authenticated request for user '{}'", identity.username);
                request.extensions_mut().insert(identity);
            }
            Err(e) => tracing::debug!("Treating request as guest: {}", e),
        }
    }

    next.run(request).await
}

/// Bearer token from the Authorization header, else the session cookie
fn extract_token(headers: &HeaderMap, cookie_name: &str) -> Option<String> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty());
    if let Some(token) = bearer {
        return Some(token.to_string());
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == cookie_name && !value.is_empty())
        .map(|(_, value)| value.to_string())
}
