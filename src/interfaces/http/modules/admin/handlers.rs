//! Admin REST API handlers

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use tracing::info;
use uuid::Uuid;

use super::dto::{BookingListQuery, StatsResponse, UpdateStatusRequest};
use crate::domain::booking::{BookingFilter, BookingStatus, CancelReason, PaymentStatus};
use crate::interfaces::http::common::{
    domain_error, ApiError, ApiResponse, ApiResult, PaginatedResponse, ValidatedJson,
};
use crate::interfaces::http::middleware::AuthenticatedAdmin;
use crate::interfaces::http::modules::bookings::BookingResponse;
use crate::interfaces::http::AppState;
use crate::shared::{validate_pagination, PaginatedResult};

fn unprocessable(message: String) -> ApiError {
    (StatusCode::UNPROCESSABLE_ENTITY, Json(ApiResponse::error(message)))
}

fn parse_filter(query: &BookingListQuery) -> Result<BookingFilter, ApiError> {
    let status = match query.status.as_deref() {
        Some(raw) => Some(
            BookingStatus::parse(raw)
                .ok_or_else(|| unprocessable(format!("unknown status '{}'", raw)))?,
        ),
        None => None,
    };
    let payment_status = match query.payment_status.as_deref() {
        Some(raw) => Some(
            PaymentStatus::parse(raw)
                .ok_or_else(|| unprocessable(format!("unknown payment status '{}'", raw)))?,
        ),
        None => None,
    };
    Ok(BookingFilter {
        status,
        payment_status,
        date_from: query.date_from,
        date_to: query.date_to,
    })
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/bookings",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(BookingListQuery),
    responses(
        (status = 200, description = "Bookings, newest first", body = ApiResponse<PaginatedResponse<BookingResponse>>),
        (status = 401, description = "Not authenticated")
    )
)]
pub async fn list_bookings(
    State(state): State<AppState>,
    Query(query): Query<BookingListQuery>,
) -> ApiResult<PaginatedResponse<BookingResponse>> {
    let filter = parse_filter(&query)?;
    let (page, limit) = validate_pagination(query.page, query.limit);
    let bookings = state.ledger.list(&filter).await.map_err(domain_error)?;
    let result = PaginatedResult::from_vec(bookings, page, limit);
    Ok(Json(ApiResponse::success(PaginatedResponse::from_result(result))))
}

#[utoipa::path(
    get,
    path = "/api/v1/admin/stats",
    tag = "Admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "Dashboard counters", body = ApiResponse<StatsResponse>)
    )
)]
pub async fn get_stats(State(state): State<AppState>) -> ApiResult<StatsResponse> {
    let stats = state.ledger.stats().await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(stats.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/bookings/{id}/cancel",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Cancelled", body = ApiResponse<BookingResponse>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Booking cannot be cancelled")
    )
)]
pub async fn cancel_booking(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<Uuid>,
) -> ApiResult<BookingResponse> {
    let booking = state
        .ledger
        .cancel(id, CancelReason::Admin)
        .await
        .map_err(domain_error)?;
    info!(booking_id = %id, by = %admin.username, "Admin cancelled booking");
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/bookings/{id}/complete",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Completed", body = ApiResponse<BookingResponse>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Booking is not confirmed or has not taken place")
    )
)]
pub async fn complete_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<BookingResponse> {
    let booking = state.ledger.mark_completed(id).await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/admin/bookings/{id}/status",
    tag = "Admin",
    security(("bearer_auth" = [])),
    params(("id" = Uuid, Path, description = "Booking ID")),
    request_body = UpdateStatusRequest,
    responses(
        (status = 200, description = "Status changed", body = ApiResponse<BookingResponse>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Transition not allowed"),
        (status = 422, description = "Unknown status")
    )
)]
pub async fn update_booking_status(
    State(state): State<AppState>,
    Extension(admin): Extension<AuthenticatedAdmin>,
    Path(id): Path<Uuid>,
    ValidatedJson(request): ValidatedJson<UpdateStatusRequest>,
) -> ApiResult<BookingResponse> {
    let target = BookingStatus::parse(&request.status)
        .ok_or_else(|| unprocessable(format!("unknown status '{}'", request.status)))?;

    let mut booking = state
        .ledger
        .override_status(id, target, &admin.username)
        .await
        .map_err(domain_error)?;
    if request.notes.is_some() {
        booking = state
            .ledger
            .annotate(id, request.notes)
            .await
            .map_err(domain_error)?;
    }
    Ok(Json(ApiResponse::success(booking.into())))
}
