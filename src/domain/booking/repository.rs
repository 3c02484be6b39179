//! Booking repository interface

use async_trait::async_trait;
use uuid::Uuid;

use super::model::{Booking, BookingFilter};
use crate::domain::DomainResult;

#[async_trait]
pub trait BookingRepository: Send + Sync {
    async fn insert(&self, booking: Booking) -> DomainResult<()>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>>;

    /// Compare-and-swap write. Succeeds only if the stored row still has
    /// `expected_version`; otherwise `ConcurrentModification`.
    async fn update(&self, booking: Booking, expected_version: i64) -> DomainResult<()>;

    /// Bookings matching `filter`, newest first
    async fn find_all(&self, filter: &BookingFilter) -> DomainResult<Vec<Booking>>;
}
