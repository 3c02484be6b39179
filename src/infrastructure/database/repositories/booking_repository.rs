//! SeaORM implementation of BookingRepository
//!
//! Writes are compare-and-swap on the `version` column: an UPDATE filtered by
//! both id and the expected version, where zero affected rows means the row
//! moved underneath us (or never existed).

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use tracing::{debug, warn};
use uuid::Uuid;

use super::{corrupt, db_err};
use crate::domain::booking::{
    Booking, BookingFilter, BookingRepository, BookingStatus, CancelReason, CustomerInfo,
    EventDetails, PaymentStatus,
};
use crate::domain::reservation::Slot;
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::booking;

pub struct SeaOrmBookingRepository {
    db: DatabaseConnection,
}

impl SeaOrmBookingRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: booking::Model) -> DomainResult<Booking> {
    let status = BookingStatus::parse(&m.status).ok_or_else(|| corrupt("booking status", &m.status))?;
    let payment_status = PaymentStatus::parse(&m.payment_status)
        .ok_or_else(|| corrupt("payment status", &m.payment_status))?;
    let cancel_reason = match m.cancel_reason.as_deref() {
        Some(raw) => Some(CancelReason::parse(raw).ok_or_else(|| corrupt("cancel reason", raw))?),
        None => None,
    };
    let duration = m.duration_minutes.max(0) as u32;

    Ok(Booking {
        id: m.id,
        service_offering_id: m.service_offering_id,
        service_name: m.service_name,
        customer: CustomerInfo {
            name: m.customer_name,
            email: m.customer_email,
            phone: m.customer_phone,
        },
        event: EventDetails {
            date: m.event_date,
            start_time: m.start_time,
            location: m.location,
            event_type: m.event_type,
            guest_count: m.guest_count.map(|g| g.max(0) as u32),
            special_requests: m.special_requests,
        },
        slot: Slot::new(m.event_date, m.start_time, duration),
        total_amount: m.total_amount,
        currency: m.currency,
        status,
        payment_status,
        payment_reference: m.payment_reference,
        cancel_reason,
        active_intent_id: m.active_intent_id,
        notes: m.notes,
        hold_expires_at: m.hold_expires_at,
        version: m.version,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn domain_to_active(b: Booking) -> booking::ActiveModel {
    booking::ActiveModel {
        id: Set(b.id),
        service_offering_id: Set(b.service_offering_id),
        service_name: Set(b.service_name),
        customer_name: Set(b.customer.name),
        customer_email: Set(b.customer.email),
        customer_phone: Set(b.customer.phone),
        event_date: Set(b.event.date),
        start_time: Set(b.event.start_time),
        duration_minutes: Set(b.slot.duration_minutes as i32),
        location: Set(b.event.location),
        event_type: Set(b.event.event_type),
        guest_count: Set(b.event.guest_count.map(|g| g as i32)),
        special_requests: Set(b.event.special_requests),
        total_amount: Set(b.total_amount),
        currency: Set(b.currency),
        status: Set(b.status.as_str().to_string()),
        payment_status: Set(b.payment_status.as_str().to_string()),
        payment_reference: Set(b.payment_reference),
        cancel_reason: Set(b.cancel_reason.map(|r| r.as_str().to_string())),
        active_intent_id: Set(b.active_intent_id),
        notes: Set(b.notes),
        hold_expires_at: Set(b.hold_expires_at),
        version: Set(b.version),
        created_at: Set(b.created_at),
        updated_at: Set(b.updated_at),
    }
}

// ── BookingRepository impl ──────────────────────────────────────

#[async_trait]
impl BookingRepository for SeaOrmBookingRepository {
    async fn insert(&self, b: Booking) -> DomainResult<()> {
        debug!(booking_id = %b.id, "Inserting booking");
        domain_to_active(b).insert(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<Booking>> {
        booking::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn update(&self, b: Booking, expected_version: i64) -> DomainResult<()> {
        let id = b.id;
        debug!(booking_id = %id, expected_version, version = b.version, "Updating booking");

        let result = booking::Entity::update_many()
            .set(domain_to_active(b))
            .filter(booking::Column::Id.eq(id))
            .filter(booking::Column::Version.eq(expected_version))
            .exec(&self.db)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            let exists = booking::Entity::find_by_id(id)
                .one(&self.db)
                .await
                .map_err(db_err)?
                .is_some();
            if !exists {
                return Err(DomainError::BookingNotFound(id));
            }
            warn!(booking_id = %id, expected_version, "Booking version moved; rejecting write");
            return Err(DomainError::ConcurrentModification(id));
        }
        Ok(())
    }

    async fn find_all(&self, filter: &BookingFilter) -> DomainResult<Vec<Booking>> {
        let mut query = booking::Entity::find();
        if let Some(status) = filter.status {
            query = query.filter(booking::Column::Status.eq(status.as_str()));
        }
        if let Some(payment) = filter.payment_status {
            query = query.filter(booking::Column::PaymentStatus.eq(payment.as_str()));
        }
        if let Some(from) = filter.date_from {
            query = query.filter(booking::Column::EventDate.gte(from));
        }
        if let Some(to) = filter.date_to {
            query = query.filter(booking::Column::EventDate.lte(to));
        }

        query
            .order_by_desc(booking::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }
}
