//! Reservation aggregate
//!
//! Slots on the shared calendar and the reservations that occupy them.

pub mod model;
pub mod repository;

pub use model::{Reservation, ReservationState, Slot};
pub use repository::ReservationRepository;
