//! SeaORM implementation of PaymentIntentRepository

use async_trait::async_trait;
use sea_orm::sea_query::OnConflict;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set};
use tracing::debug;
use uuid::Uuid;

use super::{corrupt, db_err};
use crate::domain::payment::{IntentStatus, PaymentIntent, PaymentIntentRepository};
use crate::domain::DomainResult;
use crate::infrastructure::database::entities::payment_intent;

pub struct SeaOrmPaymentIntentRepository {
    db: DatabaseConnection,
}

impl SeaOrmPaymentIntentRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

fn model_to_domain(m: payment_intent::Model) -> DomainResult<PaymentIntent> {
    let status = IntentStatus::parse(&m.status).ok_or_else(|| corrupt("intent status", &m.status))?;
    Ok(PaymentIntent {
        id: m.id,
        booking_id: m.booking_id,
        amount: m.amount,
        currency: m.currency,
        gateway_order_id: m.gateway_order_id,
        gateway_payment_id: m.gateway_payment_id,
        status,
        refund_id: m.refund_id,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn collect(models: Vec<payment_intent::Model>) -> DomainResult<Vec<PaymentIntent>> {
    models.into_iter().map(model_to_domain).collect()
}

#[async_trait]
impl PaymentIntentRepository for SeaOrmPaymentIntentRepository {
    async fn save(&self, intent: PaymentIntent) -> DomainResult<()> {
        debug!(intent_id = %intent.id, status = intent.status.as_str(), "Saving payment intent");

        let model = payment_intent::ActiveModel {
            id: Set(intent.id),
            booking_id: Set(intent.booking_id),
            amount: Set(intent.amount),
            currency: Set(intent.currency),
            gateway_order_id: Set(intent.gateway_order_id),
            gateway_payment_id: Set(intent.gateway_payment_id),
            status: Set(intent.status.as_str().to_string()),
            refund_id: Set(intent.refund_id),
            created_at: Set(intent.created_at),
            updated_at: Set(intent.updated_at),
        };

        payment_intent::Entity::insert(model)
            .on_conflict(
                OnConflict::column(payment_intent::Column::Id)
                    .update_columns([
                        payment_intent::Column::GatewayPaymentId,
                        payment_intent::Column::Status,
                        payment_intent::Column::RefundId,
                        payment_intent::Column::UpdatedAt,
                    ])
                    .to_owned(),
            )
            .exec(&self.db)
            .await
            .map_err(db_err)?;
        Ok(())
    }

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<PaymentIntent>> {
        payment_intent::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_order_id(&self, gateway_order_id: &str) -> DomainResult<Option<PaymentIntent>> {
        payment_intent::Entity::find()
            .filter(payment_intent::Column::GatewayOrderId.eq(gateway_order_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_payment_id(
        &self,
        gateway_payment_id: &str,
    ) -> DomainResult<Option<PaymentIntent>> {
        payment_intent::Entity::find()
            .filter(payment_intent::Column::GatewayPaymentId.eq(gateway_payment_id))
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_by_booking(&self, booking_id: Uuid) -> DomainResult<Vec<PaymentIntent>> {
        let models = payment_intent::Entity::find()
            .filter(payment_intent::Column::BookingId.eq(booking_id))
            .order_by_asc(payment_intent::Column::CreatedAt)
            .all(&self.db)
            .await
            .map_err(db_err)?;
        collect(models)
    }
}
