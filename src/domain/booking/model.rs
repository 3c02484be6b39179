//! Booking entity

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::state::{BookingEvent, BookingState, BookingStatus, CancelReason, PaymentStatus};
use crate::domain::reservation::Slot;
use crate::domain::service::ServiceOffering;
use crate::shared::errors::DomainError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerInfo {
    pub name: String,
    pub email: String,
    pub phone: String,
}

/// When and where the session takes place
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventDetails {
    pub date: NaiveDate,
    pub start_time: NaiveTime,
    pub location: String,
    pub event_type: Option<String>,
    pub guest_count: Option<u32>,
    pub special_requests: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Booking {
    pub id: Uuid,
    pub service_offering_id: i32,
    pub service_name: String,
    pub customer: CustomerInfo,
    pub event: EventDetails,
    pub slot: Slot,
    /// Price snapshot in minor currency units, taken at creation
    pub total_amount: i64,
    pub currency: String,
    pub status: BookingStatus,
    pub payment_status: PaymentStatus,
    pub payment_reference: Option<String>,
    pub cancel_reason: Option<CancelReason>,
    pub active_intent_id: Option<Uuid>,
    pub notes: Option<String>,
    pub hold_expires_at: DateTime<Utc>,
    /// Incremented on every write; used for compare-and-swap
    pub version: i64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    pub fn new(
        id: Uuid,
        service: &ServiceOffering,
        customer: CustomerInfo,
        event: EventDetails,
        currency: impl Into<String>,
        hold_expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Self {
        let slot = Slot::new(event.date, event.start_time, service.duration_minutes);
        Self {
            id,
            service_offering_id: service.id,
            service_name: service.name.clone(),
            customer,
            event,
            slot,
            total_amount: service.price,
            currency: currency.into(),
            status: BookingStatus::Pending,
            payment_status: PaymentStatus::Unpaid,
            payment_reference: None,
            cancel_reason: None,
            active_intent_id: None,
            notes: None,
            hold_expires_at,
            version: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn state(&self) -> BookingState {
        BookingState::new(self.status, self.payment_status)
    }

    /// Run `event` through the state machine and, if legal, record the
    /// result. On error the booking is left untouched.
    pub fn apply(&mut self, event: BookingEvent, now: DateTime<Utc>) -> Result<(), DomainError> {
        let next = self.state().apply(event)?;
        self.status = next.status;
        self.payment_status = next.payment;
        match event {
            BookingEvent::Expire => self.cancel_reason = Some(CancelReason::Expired),
            BookingEvent::Cancel(reason) => self.cancel_reason = Some(reason),
            _ => {}
        }
        self.touch(now);
        Ok(())
    }

    /// Bump version and timestamp for a write that does not change status.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.version += 1;
        self.updated_at = now;
    }

    pub fn is_pending(&self) -> bool {
        self.status == BookingStatus::Pending
    }

    pub fn is_hold_expired(&self, now: DateTime<Utc>) -> bool {
        self.is_pending() && now >= self.hold_expires_at
    }

    /// The booked window has ended, with slot times read at `offset`.
    pub fn event_has_passed(&self, now: DateTime<Utc>, offset: FixedOffset) -> bool {
        now >= self.slot.ends_at(offset)
    }
}

/// Criteria for listing bookings. `None` fields match everything.
#[derive(Debug, Clone, Default)]
pub struct BookingFilter {
    pub status: Option<BookingStatus>,
    pub payment_status: Option<PaymentStatus>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
}

impl BookingFilter {
    pub fn matches(&self, booking: &Booking) -> bool {
        if let Some(status) = self.status {
            if booking.status != status {
                return false;
            }
        }
        if let Some(payment) = self.payment_status {
            if booking.payment_status != payment {
                return false;
            }
        }
        if let Some(from) = self.date_from {
            if booking.event.date < from {
                return false;
            }
        }
        if let Some(to) = self.date_to {
            if booking.event.date > to {
                return false;
            }
        }
        true
    }
}

/// Dashboard counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookingStats {
    pub total: u64,
    pub pending: u64,
    pub confirmed: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub refund_pending: u64,
    /// Sum of `total_amount` over bookings currently paid
    pub paid_revenue: i64,
}

impl BookingStats {
    pub fn record(&mut self, booking: &Booking) {
        self.total += 1;
        match booking.status {
            BookingStatus::Pending => self.pending += 1,
            BookingStatus::Confirmed => self.confirmed += 1,
            BookingStatus::Completed => self.completed += 1,
            BookingStatus::Cancelled => self.cancelled += 1,
        }
        match booking.payment_status {
            PaymentStatus::Paid => self.paid_revenue += booking.total_amount,
            PaymentStatus::RefundPending => self.refund_pending += 1,
            _ => {}
        }
    }
}
