//! Authentication API handlers

use axum::{extract::State, http::StatusCode, Json};
use tracing::{info, warn};

use super::dto::{LoginRequest, LoginResponse};
use crate::infrastructure::crypto::jwt::create_token;
use crate::infrastructure::crypto::password::verify_password;
use crate::interfaces::http::common::{ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::AppState;

const ADMIN_ROLE: &str = "admin";

#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "Authentication",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Successful login", body = ApiResponse<LoginResponse>),
        (status = 401, description = "Invalid credentials")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<LoginRequest>,
) -> ApiResult<LoginResponse> {
    let admin = &state.admin;
    // Hash check runs even for an unknown username.
    let password_valid = verify_password(&request.password, &admin.password_hash);
    if request.username != admin.username || !password_valid {
        warn!(username = %request.username, "Failed admin login");
        return Err((
            StatusCode::UNAUTHORIZED,
            Json(ApiResponse::error("Invalid credentials")),
        ));
    }

    let jwt_config = &state.auth.jwt_config;
    let token = create_token(&admin.username, ADMIN_ROLE, jwt_config).map_err(|e| {
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ApiResponse::error(e.to_string())),
        )
    })?;

    info!(username = %admin.username, "Admin logged in");
    Ok(Json(ApiResponse::success(LoginResponse {
        token,
        token_type: "Bearer".to_string(),
        expires_in: jwt_config.expiration_hours * 3600,
        username: admin.username.clone(),
        role: ADMIN_ROLE.to_string(),
    })))
}
