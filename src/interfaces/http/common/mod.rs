//! Shared HTTP types: response envelope and domain error mapping

mod validated_json;

pub use validated_json::{BodyRejection, ValidatedJson};

use axum::http::StatusCode;
use axum::Json;
use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::error;
use utoipa::ToSchema;

use crate::domain::DomainError;

/// Standard API response envelope
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(message.into()),
        }
    }

    /// Failure that still carries a payload (e.g. alternative slots)
    pub fn error_with(data: T, message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: Some(data),
            error: Some(message.into()),
        }
    }
}

/// Paginated list payload
#[derive(Debug, Serialize, ToSchema)]
pub struct PaginatedResponse<T> {
    pub items: Vec<T>,
    pub total: u64,
    pub page: u32,
    pub limit: u32,
    pub total_pages: u32,
}

impl<T> PaginatedResponse<T> {
    pub fn from_result<U: Into<T>>(result: crate::shared::PaginatedResult<U>) -> Self {
        Self {
            items: result.items.into_iter().map(Into::into).collect(),
            total: result.total,
            page: result.page,
            limit: result.limit,
            total_pages: result.total_pages,
        }
    }
}

pub type ApiError = (StatusCode, Json<ApiResponse<()>>);

/// Accepts `HH:MM` or `HH:MM:SS`
pub fn parse_time(raw: &str) -> Result<NaiveTime, ApiError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .or_else(|_| NaiveTime::parse_from_str(raw, "%H:%M:%S"))
        .map_err(|_| {
            (
                StatusCode::UNPROCESSABLE_ENTITY,
                Json(ApiResponse::error(format!("invalid time '{}', expected HH:MM", raw))),
            )
        })
}

pub type ApiResult<T> = Result<Json<ApiResponse<T>>, ApiError>;

pub fn status_for(e: &DomainError) -> StatusCode {
    match e {
        DomainError::SlotConflict { .. }
        | DomainError::InvalidState(_)
        | DomainError::ConcurrentModification(_)
        | DomainError::StaleOrUnknownPayment(_) => StatusCode::CONFLICT,
        DomainError::ServiceNotFound(_)
        | DomainError::BookingNotFound(_)
        | DomainError::HoldNotFound(_) => StatusCode::NOT_FOUND,
        DomainError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
        DomainError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
        DomainError::GatewayTimeout => StatusCode::GATEWAY_TIMEOUT,
        DomainError::GatewayError(_) => StatusCode::BAD_GATEWAY,
        DomainError::Storage(_) | DomainError::InvariantViolation(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

/// Map a domain error onto the API error envelope. Fatal errors are
/// logged here and reported without internal detail.
pub fn domain_error(e: DomainError) -> ApiError {
    let status = status_for(&e);
    let message = if e.is_fatal() {
        error!(error = %e, "Request failed on a fatal error");
        "Internal server error".to_string()
    } else {
        e.to_string()
    };
    (status, Json(ApiResponse::error(message)))
}
