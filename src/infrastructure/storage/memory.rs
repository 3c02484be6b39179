//! In-memory repositories
//!
//! DashMap-backed implementations of every repository trait. Used by tests
//! and by `database.backend = "memory"`.

use std::sync::atomic::{AtomicBool, AtomicI32, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::booking::{Booking, BookingFilter, BookingRepository};
use crate::domain::payment::{PaymentIntent, PaymentIntentRepository};
use crate::domain::reservation::{Reservation, ReservationRepository};
use crate::domain::service::{NewServiceOffering, ServiceOffering, ServiceRepository};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::shared::SharedClock;

/// Shared switch that makes every write fail with `Storage`, for
/// exercising storage outages in tests.
#[derive(Clone, Default)]
struct Outage(Arc<AtomicBool>);

impl Outage {
    fn check(&self) -> DomainResult<()> {
        if self.0.load(Ordering::SeqCst) {
            Err(DomainError::Storage("in-memory store is unavailable".into()))
        } else {
            Ok(())
        }
    }
}

pub struct InMemoryServiceRepository {
    services: DashMap<i32, ServiceOffering>,
    next_id: AtomicI32,
    clock: SharedClock,
    outage: Outage,
}

#[async_trait]
impl ServiceRepository for InMemoryServiceRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ServiceOffering>> {
        Ok(self.services.get(&id).map(|s| s.clone()))
    }

    async fn find_all(&self) -> DomainResult<Vec<ServiceOffering>> {
        let mut all: Vec<ServiceOffering> =
            self.services.iter().map(|e| e.value().clone()).collect();
        all.sort_by_key(|s| s.id);
        Ok(all)
    }

    async fn create(&self, offering: NewServiceOffering) -> DomainResult<ServiceOffering> {
        self.outage.check()?;
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let created = offering.into_offering(id, self.clock.now());
        self.services.insert(id, created.clone());
        Ok(created)
    }

    async fn update(&self, offering: ServiceOffering) -> DomainResult<()> {
        self.outage.check()?;
        match self.services.get_mut(&offering.id) {
            Some(mut existing) => {
                *existing = offering;
                Ok(())
            }
            None => Err(DomainError::ServiceNotFound(offering.id)),
        }
    }

    async fn count(&self) -> DomainResult<u64> {
        Ok(self.services.len() as u64)
    }
}

#[derive(Default)]
pub struct InMemoryBookingRepository {
    bookings: DashMap<Uuid, Booking>,
    outage: Outage,
}

#[async_trait]
impl BookingRepository for InMemoryBookingRepository {
    async fn insert(&self, booking: Booking) -> DomainResult<()> {
        self.outage.check()?;
        match self.bookings.entry(booking.id) {
            Entry::Occupied(_) => Err(DomainError::InvariantViolation(format!(
                "booking {} already exists",
                booking.id
            ))),
            Entry::Vacant(slot) => {
                slot.insert(booking);
                Ok(())
            }
        }
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>> {
        Ok(self.bookings.get(&id).map(|b| b.clone()))
    }

    async fn update(&self, booking: Booking, expected_version: i64) -> DomainResult<()> {
        self.outage.check()?;
        let mut stored = self
            .bookings
            .get_mut(&booking.id)
            .ok_or(DomainError::BookingNotFound(booking.id))?;
        if stored.version != expected_version {
            return Err(DomainError::ConcurrentModification(booking.id));
        }
        *stored = booking;
        Ok(())
    }

    async fn find_all(&self, filter: &BookingFilter) -> DomainResult<Vec<Booking>> {
        let mut found: Vec<Booking> = self
            .bookings
            .iter()
            .filter(|e| filter.matches(e.value()))
            .map(|e| e.value().clone())
            .collect();
        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(found)
    }
}

#[derive(Default)]
pub struct InMemoryReservationRepository {
    reservations: DashMap<Uuid, Reservation>,
    outage: Outage,
}

#[async_trait]
impl ReservationRepository for InMemoryReservationRepository {
    async fn upsert(&self, reservation: Reservation) -> DomainResult<()> {
        self.outage.check()?;
        self.reservations.insert(reservation.booking_id, reservation);
        Ok(())
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> DomainResult<Option<Reservation>> {
        Ok(self.reservations.get(&booking_id).map(|r| r.clone()))
    }

    async fn delete(&self, booking_id: Uuid) -> DomainResult<()> {
        self.outage.check()?;
        self.reservations.remove(&booking_id);
        Ok(())
    }

    async fn find_all(&self) -> DomainResult<Vec<Reservation>> {
        Ok(self.reservations.iter().map(|e| e.value().clone()).collect())
    }
}

#[derive(Default)]
pub struct InMemoryPaymentIntentRepository {
    intents: DashMap<Uuid, PaymentIntent>,
    outage: Outage,
}

#[async_trait]
impl PaymentIntentRepository for InMemoryPaymentIntentRepository {
    async fn save(&self, intent: PaymentIntent) -> DomainResult<()> {
        self.outage.check()?;
        self.intents.insert(intent.id, intent);
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<PaymentIntent>> {
        Ok(self.intents.get(&id).map(|i| i.clone()))
    }

    async fn find_by_order_id(&self, gateway_order_id: &str) -> DomainResult<Option<PaymentIntent>> {
        Ok(self
            .intents
            .iter()
            .find(|e| e.gateway_order_id == gateway_order_id)
            .map(|e| e.value().clone()))
    }

    async fn find_by_payment_id(
        &self,
        gateway_payment_id: &str,
    ) -> DomainResult<Option<PaymentIntent>> {
        Ok(self
            .intents
            .iter()
            .find(|e| e.gateway_payment_id.as_deref() == Some(gateway_payment_id))
            .map(|e| e.value().clone()))
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> DomainResult<Vec<PaymentIntent>> {
        let mut found: Vec<PaymentIntent> = self
            .intents
            .iter()
            .filter(|e| e.booking_id == booking_id)
            .map(|e| e.value().clone())
            .collect();
        found.sort_by_key(|i| i.created_at);
        Ok(found)
    }
}

/// All repositories held in process memory
pub struct InMemoryRepositoryProvider {
    services: InMemoryServiceRepository,
    bookings: InMemoryBookingRepository,
    reservations: InMemoryReservationRepository,
    payment_intents: InMemoryPaymentIntentRepository,
    outage: Outage,
}

impl InMemoryRepositoryProvider {
    pub fn new(clock: SharedClock) -> Self {
        let outage = Outage::default();
        Self {
            services: InMemoryServiceRepository {
                services: DashMap::new(),
                next_id: AtomicI32::new(1),
                clock,
                outage: outage.clone(),
            },
            bookings: InMemoryBookingRepository {
                outage: outage.clone(),
                ..Default::default()
            },
            reservations: InMemoryReservationRepository {
                outage: outage.clone(),
                ..Default::default()
            },
            payment_intents: InMemoryPaymentIntentRepository {
                outage: outage.clone(),
                ..Default::default()
            },
            outage,
        }
    }

    /// Make every subsequent write fail (or succeed again).
    pub fn set_unavailable(&self, unavailable: bool) {
        self.outage.0.store(unavailable, Ordering::SeqCst);
    }
}

impl RepositoryProvider for InMemoryRepositoryProvider {
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

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::service::ServiceCategory;
    use crate::shared::system_clock;

    fn offering() -> NewServiceOffering {
        NewServiceOffering {
            name: "Portrait Session".into(),
            description: "Studio portraits".into(),
            category: ServiceCategory::Photography,
            price: 8000,
            duration_minutes: 120,
            features: vec!["20 edited photos".into()],
            is_popular: false,
        }
    }

    #[tokio::test]
    async fn service_ids_are_sequential() {
        let repos = InMemoryRepositoryProvider::new(system_clock());
        let a = repos.services().create(offering()).await.unwrap();
        let b = repos.services().create(offering()).await.unwrap();
        assert_eq!((a.id, b.id), (1, 2));
        assert_eq!(repos.services().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn outage_fails_writes_but_not_reads() {
        let repos = InMemoryRepositoryProvider::new(system_clock());
        repos.set_unavailable(true);
        let err = repos.services().create(offering()).await.unwrap_err();
        assert!(err.is_fatal());
        assert!(repos.services().find_all().await.unwrap().is_empty());

        repos.set_unavailable(false);
        assert!(repos.services().create(offering()).await.is_ok());
    }

    #[tokio::test]
    async fn intents_are_found_by_gateway_ids() {
        let repos = InMemoryRepositoryProvider::new(system_clock());
        let booking_id = Uuid::new_v4();
        let mut intent = PaymentIntent::new(booking_id, 5000, "INR", "order_1", chrono::Utc::now());
        intent.gateway_payment_id = Some("pay_1".into());
        repos.payment_intents().save(intent.clone()).await.unwrap();

        let by_order = repos.payment_intents().find_by_order_id("order_1").await.unwrap();
        let by_payment = repos.payment_intents().find_by_payment_id("pay_1").await.unwrap();
        assert_eq!(by_order.map(|i| i.id), Some(intent.id));
        assert_eq!(by_payment.map(|i| i.id), Some(intent.id));
        assert!(repos
            .payment_intents()
            .find_by_payment_id("pay_2")
            .await
            .unwrap()
            .is_none());
    }
}
