//! HTTP REST API interfaces
//!
//! - `common`: Response envelope, error mapping, validated JSON extractor
//! - `middleware`: Administrator JWT authentication
//! - `modules`: Request handlers and DTOs per resource
//! - `router`: API router with Swagger documentation

pub mod common;
pub mod middleware;
pub mod modules;
pub mod router;
pub mod state;

pub use router::create_api_router;
pub use state::{AdminCredentials, AppState, BusinessHours, HealthState};
