//! SeaORM implementation of RepositoryProvider

use sea_orm::DatabaseConnection;

use crate::domain::booking::BookingRepository;
use crate::domain::payment::PaymentIntentRepository;
use crate::domain::repositories::RepositoryProvider;
use crate::domain::reservation::ReservationRepository;
use crate::domain::service::ServiceRepository;
use crate::shared::SharedClock;

use super::booking_repository::SeaOrmBookingRepository;
use super::payment_intent_repository::SeaOrmPaymentIntentRepository;
use super::reservation_repository::SeaOrmReservationRepository;
use super::service_repository::SeaOrmServiceRepository;

/// Unified repository provider backed by SeaORM.
///
/// Holds one connection pool and exposes per-aggregate repository accessors.
///
/// ```ignore
/// let repos = SeaOrmRepositoryProvider::new(db.clone(), clock);
/// let booking = repos.bookings().find_by_id(id).await?;
/// let held = repos.reservations().find_all().await?;
/// ```
pub struct SeaOrmRepositoryProvider {
    services: SeaOrmServiceRepository,
    bookings: SeaOrmBookingRepository,
    reservations: SeaOrmReservationRepository,
    payment_intents: SeaOrmPaymentIntentRepository,
}

impl SeaOrmRepositoryProvider {
    pub fn new(db: DatabaseConnection, clock: SharedClock) -> Self {
        Self {
            services: SeaOrmServiceRepository::new(db.clone(), clock),
            bookings: SeaOrmBookingRepository::new(db.clone()),
            reservations: SeaOrmReservationRepository::new(db.clone()),
            payment_intents: SeaOrmPaymentIntentRepository::new(db),
        }
    }
}

impl RepositoryProvider for SeaOrmRepositoryProvider {
    fn services(&self) -> &dyn ServiceRepository {
        &self.services
    }

    fn bookings(&self) -> &dyn BookingRepository {
        &self.bookings
    }

    fn reservations(&self) -> &dyn ReservationRepository {
        &self.reservations
    }

    fn payment_intents(&self) -> &dyn PaymentIntentRepository {
        &self.payment_intents
    }
}
