//! Reservation repository interface
//!
//! Durable mirror of the in-memory calendar. Keyed by booking: a booking
//! owns at most one reservation.

use async_trait::async_trait;
use uuid::Uuid;

use super::model::Reservation;
use crate::domain::DomainResult;

#[async_trait]
pub trait ReservationRepository: Send + Sync {
    /// Insert or replace the reservation for `reservation.booking_id`
    async fn upsert(&self, reservation: Reservation) -> DomainResult<()>;

    async fn find_by_booking(&self, booking_id: Uuid) -> DomainResult<Option<Reservation>>;

    /// Remove the reservation for a booking. Missing rows are not an error.
    async fn delete(&self, booking_id: Uuid) -> DomainResult<()>;

    async fn find_all(&self) -> DomainResult<Vec<Reservation>>;
}
