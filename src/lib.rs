//! # Studio Booking
//!
//! Booking and payment reconciliation engine for a photography and
//! videography studio.
//!
//! ## Architecture
//!
//! - **domain**: Entities, the booking state machine, repository traits
//! - **application**: Catalog, availability calendar, booking ledger,
//!   payment reconciler and the background workers
//! - **infrastructure**: SQLite and in-memory storage, gateway adapters, crypto
//! - **interfaces**: REST API with Swagger documentation
//! - **shared**: Errors, clock, retry and shutdown helpers

pub mod application;
pub mod config;
pub mod domain;
pub mod infrastructure;
pub mod interfaces;
pub mod server;
pub mod shared;

#[cfg(test)]
mod tests;

pub use config::{default_config_path, resolve_config_path, AppConfig};

pub use infrastructure::{
    init_database, run_migrations, DatabaseConfig, InMemoryRepositoryProvider,
    SeaOrmRepositoryProvider,
};

pub use interfaces::http::create_api_router;

pub use application::{create_event_bus, Event, EventBus, SharedEventBus};
