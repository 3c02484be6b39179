//! Booking DTOs

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

use crate::domain::booking::Booking;
use crate::domain::payment::PaymentIntent;

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct CreateBookingRequest {
    pub service_id: i32,
    #[validate(length(min = 1, max = 100, message = "customer name is required"))]
    pub customer_name: String,
    #[validate(email(message = "invalid email format"))]
    pub customer_email: String,
    #[validate(length(min = 7, max = 20, message = "phone must be 7-20 characters"))]
    pub customer_phone: String,
    pub event_date: NaiveDate,
    /// HH:MM, studio local time
    pub start_time: String,
    #[validate(length(min = 1, max = 200, message = "location is required"))]
    pub location: String,
    #[validate(length(max = 100))]
    pub event_type: Option<String>,
    #[validate(range(min = 1, max = 5000))]
    pub guest_count: Option<u32>,
    #[validate(length(max = 2000))]
    pub special_requests: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct CustomerDto {
    pub name: String,
    pub email: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct BookingResponse {
    pub id: Uuid,
    pub service_id: i32,
    pub service_name: String,
    pub customer: CustomerDto,
    pub event_date: NaiveDate,
    pub start_time: String,
    pub end_time: String,
    pub duration_minutes: u32,
    pub location: String,
    pub event_type: Option<String>,
    pub guest_count: Option<u32>,
    pub special_requests: Option<String>,
    /// Minor currency units
    pub total_amount: i64,
    pub currency: String,
    pub status: String,
    pub payment_status: String,
    pub payment_reference: Option<String>,
    pub cancel_reason: Option<String>,
    pub notes: Option<String>,
    pub hold_expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Booking> for BookingResponse {
    fn from(b: Booking) -> Self {
        Self {
            id: b.id,
            service_id: b.service_offering_id,
            service_name: b.service_name,
            customer: CustomerDto {
                name: b.customer.name,
                email: b.customer.email,
                phone: b.customer.phone,
            },
            event_date: b.event.date,
            start_time: b.slot.start_time.format("%H:%M").to_string(),
            end_time: b.slot.end_time().format("%H:%M").to_string(),
            duration_minutes: b.slot.duration_minutes,
            location: b.event.location,
            event_type: b.event.event_type,
            guest_count: b.event.guest_count,
            special_requests: b.event.special_requests,
            total_amount: b.total_amount,
            currency: b.currency,
            status: b.status.to_string(),
            payment_status: b.payment_status.to_string(),
            payment_reference: b.payment_reference,
            cancel_reason: b.cancel_reason.map(|r| r.as_str().to_string()),
            notes: b.notes,
            hold_expires_at: b.hold_expires_at,
            created_at: b.created_at,
            updated_at: b.updated_at,
        }
    }
}

/// Returned with a 409 when the requested slot is taken
#[derive(Debug, Serialize, ToSchema)]
pub struct SlotConflictDetails {
    pub suggested_start_times: Vec<String>,
}

/// What the checkout widget needs to collect payment
#[derive(Debug, Serialize, ToSchema)]
pub struct PaymentIntentResponse {
    pub intent_id: Uuid,
    pub booking_id: Uuid,
    pub gateway: String,
    /// Public gateway key, if the gateway uses one
    pub key_id: Option<String>,
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
    pub status: String,
}

impl PaymentIntentResponse {
    pub fn new(intent: PaymentIntent, gateway: &str, key_id: Option<String>) -> Self {
        Self {
            intent_id: intent.id,
            booking_id: intent.booking_id,
            gateway: gateway.to_string(),
            key_id,
            order_id: intent.gateway_order_id,
            amount: intent.amount,
            currency: intent.currency,
            status: intent.status.to_string(),
        }
    }
}
