//! Authentication middleware for Axum
//!
//! Admin routes require `Authorization: Bearer <jwt>` carrying the `admin`
//! role.

use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::debug;

use crate::infrastructure::crypto::jwt::{verify_token, JwtConfig, TokenClaims};

/// Authentication error types
#[derive(Debug)]
pub enum AuthError {
    MissingToken,
    InvalidToken,
    InsufficientPermissions,
}

/// Authentication state containing JWT config
#[derive(Clone)]
pub struct AuthState {
    pub jwt_config: JwtConfig,
}

/// Authenticated administrator, inserted into request extensions
#[derive(Clone, Debug)]
pub struct AuthenticatedAdmin {
    pub username: String,
    pub role: String,
}

impl AuthenticatedAdmin {
    pub fn from_claims(claims: TokenClaims) -> Self {
        Self {
            username: claims.sub,
            role: claims.role,
        }
    }
}

fn extract_token(auth_header: &str) -> Option<&str> {
    auth_header.strip_prefix("Bearer ")
}

/// JWT authentication middleware for administrator routes
pub async fn admin_auth_middleware(
    State(auth_state): State<AuthState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(auth_header) = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    else {
        return auth_error_response(AuthError::MissingToken);
    };

    let Some(token) = extract_token(auth_header) else {
        return auth_error_response(AuthError::InvalidToken);
    };

    match verify_token(token, &auth_state.jwt_config) {
        Ok(claims) if claims.is_admin() => {
            request
                .extensions_mut()
                .insert(AuthenticatedAdmin::from_claims(claims));
            next.run(request).await
        }
        Ok(claims) => {
            debug!(user = %claims.sub, role = %claims.role, "Non-admin token on admin route");
            auth_error_response(AuthError::InsufficientPermissions)
        }
        Err(e) => {
            debug!(error = %e, "Rejected bearer token");
            auth_error_response(AuthError::InvalidToken)
        }
    }
}

fn auth_error_response(error: AuthError) -> Response {
    let (status, message) = match error {
        AuthError::MissingToken => (StatusCode::UNAUTHORIZED, "Missing authentication token"),
        AuthError::InvalidToken => (StatusCode::UNAUTHORIZED, "Invalid authentication token"),
        AuthError::InsufficientPermissions => (StatusCode::FORBIDDEN, "Insufficient permissions"),
    };

    let body = Json(json!({
        "success": false,
        "error": message
    }));

    (status, body).into_response()
}
