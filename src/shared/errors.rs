use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum DomainError {
    /// Another held or committed reservation overlaps the requested window.
    #[error("Slot conflict: {date} {start}-{end} is already taken")]
    SlotConflict {
        date: chrono::NaiveDate,
        start: chrono::NaiveTime,
        end: chrono::NaiveTime,
    },

    #[error("Service offering {0} not found")]
    ServiceNotFound(i32),

    #[error("Booking {0} not found")]
    BookingNotFound(Uuid),

    #[error("No hold exists for booking {0}")]
    HoldNotFound(Uuid),

    /// Operation is not legal in the booking's current state.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    /// Callback does not match any active payment intent.
    #[error("Stale or unknown payment: {0}")]
    StaleOrUnknownPayment(String),

    /// Optimistic lock lost; the whole command should be retried.
    #[error("Booking {0} was modified concurrently")]
    ConcurrentModification(Uuid),

    #[error("Payment gateway timed out")]
    GatewayTimeout,

    #[error("Payment gateway error: {0}")]
    GatewayError(String),

    #[error("Validation: {0}")]
    Validation(String),

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Storage is unavailable. Fatal for the current operation.
    #[error("Storage error: {0}")]
    Storage(String),

    /// Internal consistency broken (e.g. a committed reservation with no booking).
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

impl DomainError {
    pub fn invalid_state(msg: impl Into<String>) -> Self {
        Self::InvalidState(msg.into())
    }

    pub fn stale(msg: impl Into<String>) -> Self {
        Self::StaleOrUnknownPayment(msg.into())
    }

    /// Whether this error is likely transient and the operation may
    /// succeed if retried.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::GatewayTimeout | Self::GatewayError(_) | Self::Storage(_)
        )
    }

    /// Whether the error signals an unrecoverable condition that must be
    /// surfaced loudly rather than handled.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Storage(_) | Self::InvariantViolation(_))
    }
}

#[derive(Debug, Error)]
pub enum InfraError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),

    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl From<InfraError> for DomainError {
    fn from(e: InfraError) -> Self {
        match e {
            InfraError::Http(err) if err.is_timeout() => DomainError::GatewayTimeout,
            InfraError::Http(err) => DomainError::GatewayError(err.to_string()),
            other => DomainError::Storage(other.to_string()),
        }
    }
}

/// Result type for domain operations
pub type DomainResult<T> = Result<T, DomainError>;
