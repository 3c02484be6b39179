//! SeaORM implementation of ReservationRepository

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{DatabaseConnection, EntityTrait, QueryOrder, Set};
use tracing::debug;
use uuid::Uuid;

use super::{corrupt, db_err};
use crate::domain::reservation::{Reservation, ReservationRepository, ReservationState, Slot};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::reservation;

pub struct SeaOrmReservationRepository {
    db: DatabaseConnection,
}

impl SeaOrmReservationRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: reservation::Model) -> DomainResult<Reservation> {
    let state = match (m.state.as_str(), m.expires_at) {
        ("held", Some(expires_at)) => ReservationState::Held { expires_at },
        ("committed", _) => ReservationState::Committed,
        (other, _) => return Err(corrupt("reservation state", other)),
    };
    Ok(Reservation {
        booking_id: m.booking_id,
        service_offering_id: m.service_offering_id,
        slot: Slot::new(m.event_date, m.start_time, m.duration_minutes.max(0) as u32),
        state,
        created_at: m.created_at,
    })
}

fn domain_to_active(r: &Reservation) -> reservation::ActiveModel {
    reservation::ActiveModel {
        booking_id: Set(r.booking_id),
        service_offering_id: Set(r.service_offering_id),
        event_date: Set(r.slot.date),
        start_time: Set(r.slot.start_time),
        duration_minutes: Set(r.slot.duration_minutes as i32),
        state: Set(r.state.as_str().to_string()),
        expires_at: Set(r.expires_at()),
        created_at: Set(r.created_at),
    }
}

// ── ReservationRepository impl ──────────────────────────────────

#[async_trait]
impl ReservationRepository for SeaOrmReservationRepository {
    async fn upsert(&self, r: Reservation) -> DomainResult<()> {
        debug!(booking_id = %r.booking_id, state = r.state.as_str(), "Saving reservation");

        reservation::Entity::insert(domain_to_active(&r))
            .on_conflict(
                OnConflict::column(reservation::Column::BookingId)
                    .update_columns([
                        reservation::Column::ServiceOfferingId,
                        reservation::Column::EventDate,
                        reservation::Column::StartTime,
                        reservation::Column::DurationMinutes,
                        reservation::Column::State,
                        reservation::Column::ExpiresAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> DomainResult<Option<Reservation>> {
        reservation::Entity::find_by_id(booking_id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn delete(&self, booking_id: Uuid) -> DomainResult<()> {
        debug!(%booking_id, "Deleting reservation");
        reservation::Entity::delete_by_id(booking_id)
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_all(&self) -> DomainResult<Vec<Reservation>> {
        reservation::Entity::find()
            .order_by_asc(reservation::Column::EventDate)
            .order_by_asc(reservation::Column::StartTime)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }
}
