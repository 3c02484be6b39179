//! Payment DTOs

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::interfaces::http::modules::bookings::BookingResponse;

/// Fields the checkout widget hands back after a payment
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct VerifyPaymentRequest {
    #[serde(alias = "razorpay_order_id")]
    #[validate(length(min = 1, message = "order_id is required"))]
    pub order_id: String,
    #[serde(alias = "razorpay_payment_id")]
    #[validate(length(min = 1, message = "payment_id is required"))]
    pub payment_id: String,
    #[serde(alias = "razorpay_signature")]
    #[validate(length(min = 1, message = "signature is required"))]
    pub signature: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct VerifyPaymentResponse {
    /// confirmed or already_applied
    pub outcome: String,
    pub booking: BookingResponse,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WebhookAck {
    /// applied, duplicate or ignored
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}
