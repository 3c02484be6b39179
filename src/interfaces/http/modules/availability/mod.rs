//! Availability module: day schedule and free start times

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
