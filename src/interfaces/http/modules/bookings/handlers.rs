//! Booking REST API handlers

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use tracing::info;
use uuid::Uuid;

use super::dto::{BookingResponse, CreateBookingRequest, PaymentIntentResponse, SlotConflictDetails};
use crate::application::NewBooking;
use crate::domain::booking::{CustomerInfo, EventDetails};
use crate::domain::DomainError;
use crate::interfaces::http::common::{
    domain_error, parse_time, ApiResponse, ApiResult, ValidatedJson,
};
use crate::interfaces::http::AppState;

#[utoipa::path(
    post,
    path = "/api/v1/bookings",
    tag = "Bookings",
    request_body = CreateBookingRequest,
    responses(
        (status = 201, description = "Booking created, slot held", body = ApiResponse<BookingResponse>),
        (status = 404, description = "Unknown service"),
        (status = 409, description = "Slot taken", body = ApiResponse<SlotConflictDetails>),
        (status = 422, description = "Invalid data")
    )
)]
pub async fn create_booking(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<CreateBookingRequest>,
) -> Result<(StatusCode, Json<ApiResponse<BookingResponse>>), Response> {
    let start_time = parse_time(&request.start_time).map_err(IntoResponse::into_response)?;
    let service_id = request.service_id;
    let date = request.event_date;

    let new_booking = NewBooking {
        service_offering_id: service_id,
        customer: CustomerInfo {
            name: request.customer_name.trim().to_string(),
            email: request.customer_email.trim().to_string(),
            phone: request.customer_phone.trim().to_string(),
        },
        event: EventDetails {
            date,
            start_time,
            location: request.location.trim().to_string(),
            event_type: request.event_type,
            guest_count: request.guest_count,
            special_requests: request.special_requests,
        },
    };

    match state.ledger.create(new_booking).await {
        Ok(booking) => Ok((StatusCode::CREATED, Json(ApiResponse::success(booking.into())))),
        Err(e @ DomainError::SlotConflict { .. }) => {
            let suggested = suggestions(&state, service_id, date).await;
            let body = ApiResponse::error_with(
                SlotConflictDetails {
                    suggested_start_times: suggested,
                },
                e.to_string(),
            );
            Err((StatusCode::CONFLICT, Json(body)).into_response())
        }
        Err(e) => Err(domain_error(e).into_response()),
    }
}

async fn suggestions(state: &AppState, service_id: i32, date: chrono::NaiveDate) -> Vec<String> {
    let Ok(service) = state.ledger.catalog().get(service_id).await else {
        return Vec::new();
    };
    let hours = state.business_hours;
    state
        .ledger
        .availability()
        .suggest_slots(
            date,
            service.duration_minutes,
            hours.opening,
            hours.closing,
            hours.step_minutes,
        )
        .await
        .into_iter()
        .map(|t| t.format("%H:%M").to_string())
        .collect()
}

#[utoipa::path(
    get,
    path = "/api/v1/bookings/{id}",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Booking details", body = ApiResponse<BookingResponse>),
        (status = 404, description = "Not found")
    )
)]
pub async fn get_booking(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<BookingResponse> {
    let booking = state.ledger.get(id).await.map_err(domain_error)?;
    Ok(Json(ApiResponse::success(booking.into())))
}

#[utoipa::path(
    post,
    path = "/api/v1/bookings/{id}/payment",
    tag = "Bookings",
    params(("id" = Uuid, Path, description = "Booking ID")),
    responses(
        (status = 200, description = "Open payment intent", body = ApiResponse<PaymentIntentResponse>),
        (status = 404, description = "Not found"),
        (status = 409, description = "Booking is not awaiting payment"),
        (status = 502, description = "Gateway error"),
        (status = 504, description = "Gateway timed out")
    )
)]
pub async fn request_payment(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<PaymentIntentResponse> {
    let intent = state
        .reconciler
        .create_intent(id)
        .await
        .map_err(domain_error)?;
    info!(booking_id = %id, order_id = %intent.gateway_order_id, "Payment intent issued");
    Ok(Json(ApiResponse::success(PaymentIntentResponse::new(
        intent,
        state.reconciler.gateway_name(),
        state.gateway_key_id.clone(),
    ))))
}
