//! Payment intent aggregate

pub mod model;
pub mod repository;

pub use model::{IntentStatus, PaymentIntent};
pub use repository::PaymentIntentRepository;
