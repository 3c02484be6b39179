//! Booking module: create, look up, start payment

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
