//! Payment REST API handlers

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    Json,
};
use tracing::{info, warn};

use super::dto::{VerifyPaymentRequest, VerifyPaymentResponse, WebhookAck};
use crate::application::PaymentOutcome;
use crate::domain::DomainError;
use crate::interfaces::http::common::{domain_error, ApiError, ApiResponse, ApiResult, ValidatedJson};
use crate::interfaces::http::AppState;

/// Header carrying the webhook HMAC
pub const WEBHOOK_SIGNATURE_HEADER: &str = "x-razorpay-signature";

#[utoipa::path(
    post,
    path = "/api/v1/payments/verify",
    tag = "Payments",
    request_body = VerifyPaymentRequest,
    responses(
        (status = 200, description = "Payment applied", body = ApiResponse<VerifyPaymentResponse>),
        (status = 400, description = "Signature did not verify"),
        (status = 409, description = "Stale or unknown payment")
    )
)]
pub async fn verify_payment(
    State(state): State<AppState>,
    ValidatedJson(request): ValidatedJson<VerifyPaymentRequest>,
) -> ApiResult<VerifyPaymentResponse> {
    let outcome = state
        .reconciler
        .handle_callback(&request.order_id, &request.payment_id, &request.signature)
        .await
        .map_err(domain_error)?;

    match outcome {
        PaymentOutcome::Confirmed(booking) => {
            info!(booking_id = %booking.id, payment_id = %request.payment_id, "Payment verified");
            Ok(Json(ApiResponse::success(VerifyPaymentResponse {
                outcome: "confirmed".to_string(),
                booking: booking.into(),
            })))
        }
        PaymentOutcome::AlreadyApplied(booking) => {
            Ok(Json(ApiResponse::success(VerifyPaymentResponse {
                outcome: "already_applied".to_string(),
                booking: booking.into(),
            })))
        }
        PaymentOutcome::VerificationFailed(_) => Err((
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error("Payment verification failed")),
        )),
    }
}

#[utoipa::path(
    post,
    path = "/api/v1/payments/webhook",
    tag = "Payments",
    request_body(content = String, description = "Raw gateway event", content_type = "application/json"),
    responses(
        (status = 200, description = "Event acknowledged", body = WebhookAck),
        (status = 401, description = "Bad signature")
    )
)]
pub async fn payment_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<WebhookAck>, ApiError> {
    let signature = headers
        .get(WEBHOOK_SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();

    match state.reconciler.handle_webhook(&body, signature).await {
        Ok(outcome) => {
            let detail = match &outcome {
                crate::application::WebhookOutcome::Ignored(reason) => Some(reason.clone()),
                _ => None,
            };
            Ok(Json(WebhookAck {
                status: outcome.as_str().to_string(),
                detail,
            }))
        }
        // Gateways redeliver on non-2xx.
        Err(DomainError::StaleOrUnknownPayment(reason)) => {
            warn!(%reason, "Stale webhook acknowledged");
            Ok(Json(WebhookAck {
                status: "ignored".to_string(),
                detail: Some(reason),
            }))
        }
        Err(e) => Err(domain_error(e)),
    }
}
