//! Database repository implementations
//!
//! Per-aggregate SeaORM repositories + unified RepositoryProvider.

pub mod booking_repository;
pub mod payment_intent_repository;
pub mod repository_provider;
pub mod reservation_repository;
pub mod service_repository;

pub use repository_provider::SeaOrmRepositoryProvider;

use crate::domain::DomainError;
use crate::shared::errors::InfraError;

pub(crate) fn db_err(e: sea_orm::DbErr) -> DomainError {
    InfraError::Database(e).into()
}

/// A stored column holds a value the domain cannot represent.
pub(crate) fn corrupt(column: &str, value: &str) -> DomainError {
    DomainError::InvariantViolation(format!("unrecognised {column} '{value}' in storage"))
}
