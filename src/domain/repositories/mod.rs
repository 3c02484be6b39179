//! Repository aggregate for the domain layer
//!
//! `RepositoryProvider` hands out the per-aggregate repositories so callers
//! depend only on what they use:
//!
//! ```ignore
//! async fn handle(repos: &dyn RepositoryProvider) {
//!     let booking = repos.bookings().find_by_id(id).await?;
//!     let intents = repos.payment_intents().find_by_booking(id).await?;
//! }
//! ```

use super::booking::BookingRepository;
use super::payment::PaymentIntentRepository;
use super::reservation::ReservationRepository;
use super::service::ServiceRepository;

pub use crate::shared::errors::DomainResult;

pub trait RepositoryProvider: Send + Sync {
    fn services(&self) -> &dyn ServiceRepository;
    fn bookings(&self) -> &dyn BookingRepository;
    fn reservations(&self) -> &dyn ReservationRepository;
    fn payment_intents(&self) -> &dyn PaymentIntentRepository;
}
