//! Availability REST API handlers

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};

use super::dto::{AvailabilityQuery, AvailabilityResponse, BusyWindow};
use crate::domain::reservation::Slot;
use crate::interfaces::http::common::{domain_error, parse_time, ApiResponse, ApiResult};
use crate::interfaces::http::AppState;

#[utoipa::path(
    get,
    path = "/api/v1/availability",
    tag = "Availability",
    params(AvailabilityQuery),
    responses(
        (status = 200, description = "Day schedule", body = ApiResponse<AvailabilityResponse>),
        (status = 404, description = "Unknown service"),
        (status = 422, description = "Invalid query")
    )
)]
pub async fn get_availability(
    State(state): State<AppState>,
    Query(query): Query<AvailabilityQuery>,
) -> ApiResult<AvailabilityResponse> {
    let availability = state.ledger.availability();
    let busy = availability
        .reservations_on(query.date)
        .await
        .iter()
        .map(BusyWindow::from)
        .collect();

    let mut suggested_start_times = Vec::new();
    let mut requested_available = None;

    if let Some(service_id) = query.service_id {
        let service = state
            .ledger
            .catalog()
            .get_active(service_id)
            .await
            .map_err(domain_error)?;
        let hours = state.business_hours;
        suggested_start_times = availability
            .suggest_slots(
                query.date,
                service.duration_minutes,
                hours.opening,
                hours.closing,
                hours.step_minutes,
            )
            .await
            .into_iter()
            .map(|t| t.format("%H:%M").to_string())
            .collect();

        if let Some(raw) = query.start_time.as_deref() {
            let start = parse_time(raw)?;
            let slot = Slot::new(query.date, start, service.duration_minutes);
            requested_available = Some(availability.check_available(&slot).await);
        }
    } else if query.start_time.is_some() {
        return Err((
            StatusCode::UNPROCESSABLE_ENTITY,
            Json(ApiResponse::error("start_time requires service_id")),
        ));
    }

    Ok(Json(ApiResponse::success(AvailabilityResponse {
        date: query.date,
        busy,
        suggested_start_times,
        requested_available,
    })))
}
