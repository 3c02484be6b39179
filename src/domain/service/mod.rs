//! Service offering aggregate
//!
//! Bookable offerings with their price and duration.

pub mod model;
pub mod repository;

pub use model::{NewServiceOffering, ServiceCategory, ServiceOffering};
pub use repository::ServiceRepository;
