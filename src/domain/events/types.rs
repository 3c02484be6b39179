//! Notification events
//!
//! Facts about booking lifecycle transitions, broadcast to subscribers.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum Event {
    BookingCreated(BookingCreatedEvent),
    BookingConfirmed(BookingConfirmedEvent),
    BookingCancelled(BookingCancelledEvent),
    BookingExpired(BookingExpiredEvent),
    BookingCompleted(BookingCompletedEvent),
    PaymentFailed(PaymentFailedEvent),
    RefundCompleted(RefundCompletedEvent),
}

impl Event {
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::BookingCreated(_) => "booking_created",
            Event::BookingConfirmed(_) => "booking_confirmed",
            Event::BookingCancelled(_) => "booking_cancelled",
            Event::BookingExpired(_) => "booking_expired",
            Event::BookingCompleted(_) => "booking_completed",
            Event::PaymentFailed(_) => "payment_failed",
            Event::RefundCompleted(_) => "refund_completed",
        }
    }

    pub fn booking_id(&self) -> Uuid {
        match self {
            Event::BookingCreated(e) => e.booking_id,
            Event::BookingConfirmed(e) => e.booking_id,
            Event::BookingCancelled(e) => e.booking_id,
            Event::BookingExpired(e) => e.booking_id,
            Event::BookingCompleted(e) => e.booking_id,
            Event::PaymentFailed(e) => e.booking_id,
            Event::RefundCompleted(e) => e.booking_id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCreatedEvent {
    pub booking_id: Uuid,
    pub service_name: String,
    pub customer_email: String,
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub hold_expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingConfirmedEvent {
    pub booking_id: Uuid,
    pub customer_email: String,
    pub payment_reference: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCancelledEvent {
    pub booking_id: Uuid,
    pub customer_email: String,
    pub reason: String,
    pub refund_pending: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingExpiredEvent {
    pub booking_id: Uuid,
    pub customer_email: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingCompletedEvent {
    pub booking_id: Uuid,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentFailedEvent {
    pub booking_id: Uuid,
    pub gateway_order_id: String,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefundCompletedEvent {
    pub booking_id: Uuid,
    pub refund_id: String,
    pub amount: i64,
}

/// Envelope delivered to subscribers
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventMessage {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    #[serde(flatten)]
    pub event: Event,
}

impl EventMessage {
    pub fn new(event: Event, timestamp: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            event,
        }
    }
}
