//! Database entities module

pub mod booking;
pub mod payment_intent;
pub mod reservation;
pub mod service;

pub use booking::Entity as Booking;
pub use payment_intent::Entity as PaymentIntent;
pub use reservation::Entity as Reservation;
pub use service::Entity as Service;
