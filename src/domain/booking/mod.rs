//! Booking aggregate

pub mod model;
pub mod repository;
pub mod state;

pub use model::{Booking, BookingFilter, BookingStats, CustomerInfo, EventDetails};
pub use repository::BookingRepository;
pub use state::{BookingEvent, BookingState, BookingStatus, CancelReason, PaymentStatus};
