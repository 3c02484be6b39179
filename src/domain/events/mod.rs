//! Domain events
//!
//! Event types that represent facts about what happened to a booking.
//! The EventBus implementation lives in `application::events`.

pub mod types;

pub use types::{
    BookingCancelledEvent, BookingCompletedEvent, BookingConfirmedEvent, BookingCreatedEvent,
    BookingExpiredEvent, Event, EventMessage, PaymentFailedEvent, RefundCompletedEvent,
};
