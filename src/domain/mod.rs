pub mod booking;
pub mod events;
pub mod payment;
pub mod repositories;
pub mod reservation;
pub mod service;

// Re-export commonly used types
pub use booking::{
    Booking, BookingEvent, BookingFilter, BookingState, BookingStats, BookingStatus,
    CancelReason, CustomerInfo, EventDetails, PaymentStatus,
};
pub use payment::{IntentStatus, PaymentIntent};
pub use repositories::{DomainResult, RepositoryProvider};
pub use reservation::{Reservation, ReservationState, Slot};
pub use service::{NewServiceOffering, ServiceCategory, ServiceOffering};

pub use crate::shared::errors::DomainError;
