pub mod admin;
pub mod auth;
pub mod availability;
pub mod bookings;
pub mod health;
pub mod metrics;
pub mod payments;
pub mod request_id;
pub mod services;
