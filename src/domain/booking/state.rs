//! Booking lifecycle state machine
//!
//! [`BookingState::apply`] is the only place that decides whether a
//! transition is legal. Callers mutate a booking exclusively through it.
//!
//! ```text
//! pending ──payment──▶ confirmed ──complete──▶ completed
//!    │                     │
//!    ├──expire/cancel──▶ cancelled ◀──cancel──┘
//!                          │
//!   payment: unpaid │ paid ──▶ refund_pending ──▶ refunded
//! ```

use serde::{Deserialize, Serialize};

use crate::shared::errors::DomainError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl BookingStatus {
    pub const ALL: [BookingStatus; 4] = [
        Self::Pending,
        Self::Confirmed,
        Self::Completed,
        Self::Cancelled,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "confirmed" => Some(Self::Confirmed),
            "completed" => Some(Self::Completed),
            "cancelled" => Some(Self::Cancelled),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl std::fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Unpaid,
    Paid,
    RefundPending,
    Refunded,
}

impl PaymentStatus {
    pub const ALL: [PaymentStatus; 4] = [
        Self::Unpaid,
        Self::Paid,
        Self::RefundPending,
        Self::Refunded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unpaid => "unpaid",
            Self::Paid => "paid",
            Self::RefundPending => "refund_pending",
            Self::Refunded => "refunded",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "unpaid" => Some(Self::Unpaid),
            "paid" => Some(Self::Paid),
            "refund_pending" => Some(Self::RefundPending),
            "refunded" => Some(Self::Refunded),
            _ => None,
        }
    }
}

impl std::fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Why a booking ended up cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CancelReason {
    /// Hold TTL elapsed before payment completed
    Expired,
    Customer,
    Admin,
}

impl CancelReason {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Expired => "expired",
            Self::Customer => "customer",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "expired" => Some(Self::Expired),
            "customer" => Some(Self::Customer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// Everything that can happen to a booking
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BookingEvent {
    /// Verified gateway payment or an administrator's manual payment
    PaymentConfirmed,
    /// Hold TTL elapsed
    Expire,
    Cancel(CancelReason),
    /// Event date has passed
    Complete,
    /// Payment captured after the booking was already cancelled
    LatePaymentCaptured,
    RefundConfirmed,
}

impl BookingEvent {
    pub const ALL: [BookingEvent; 8] = [
        Self::PaymentConfirmed,
        Self::Expire,
        Self::Cancel(CancelReason::Customer),
        Self::Cancel(CancelReason::Admin),
        Self::Cancel(CancelReason::Expired),
        Self::Complete,
        Self::LatePaymentCaptured,
        Self::RefundConfirmed,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::PaymentConfirmed => "payment_confirmed",
            Self::Expire => "expire",
            Self::Cancel(_) => "cancel",
            Self::Complete => "complete",
            Self::LatePaymentCaptured => "late_payment_captured",
            Self::RefundConfirmed => "refund_confirmed",
        }
    }
}

/// The pair of statuses a booking carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BookingState {
    pub status: BookingStatus,
    pub payment: PaymentStatus,
}

impl BookingState {
    pub const INITIAL: BookingState = BookingState {
        status: BookingStatus::Pending,
        payment: PaymentStatus::Unpaid,
    };

    pub fn new(status: BookingStatus, payment: PaymentStatus) -> Self {
        Self { status, payment }
    }

    /// Compute the state after `event`, or `InvalidState` if the edge does
    /// not exist. `self` is never modified.
    pub fn apply(self, event: BookingEvent) -> Result<BookingState, DomainError> {
        use BookingStatus::*;
        use PaymentStatus::*;

        let next = match (self.status, self.payment, event) {
            (Pending, Unpaid, BookingEvent::PaymentConfirmed) => Self::new(Confirmed, Paid),
            (Pending, Unpaid, BookingEvent::Expire) => Self::new(Cancelled, Unpaid),
            (Pending, Unpaid, BookingEvent::Cancel(_)) => Self::new(Cancelled, Unpaid),
            (Confirmed, Paid, BookingEvent::Cancel(_)) => Self::new(Cancelled, RefundPending),
            (Confirmed, payment, BookingEvent::Complete) => Self::new(Completed, payment),
            (Cancelled, Unpaid, BookingEvent::LatePaymentCaptured) => {
                Self::new(Cancelled, RefundPending)
            }
            (Cancelled, RefundPending, BookingEvent::RefundConfirmed) => {
                Self::new(Cancelled, Refunded)
            }
            (status, payment, event) => {
                return Err(DomainError::invalid_state(format!(
                    "cannot {} a booking that is {}/{}",
                    event.name(),
                    status,
                    payment
                )))
            }
        };
        Ok(next)
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
