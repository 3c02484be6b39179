//! Booking entity

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "bookings")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    pub service_offering_id: i32,
    pub service_name: String,

    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,

    pub event_date: Date,
    pub start_time: Time,
    pub duration_minutes: i32,
    pub location: String,
    pub event_type: Option<String>,
    pub guest_count: Option<i32>,
    pub special_requests: Option<String>,

    pub total_amount: i64,
    pub currency: String,

    /// pending, confirmed, completed, cancelled
    pub status: String,
    /// unpaid, paid, refund_pending, refunded
    pub payment_status: String,
    pub payment_reference: Option<String>,
    pub cancel_reason: Option<String>,
    pub active_intent_id: Option<Uuid>,
    pub notes: Option<String>,

    pub hold_expires_at: DateTimeUtc,

    /// Optimistic lock counter
    pub version: i64,

    pub created_at: DateTimeUtc,
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::service::Entity",
        from = "Column::ServiceOfferingId",
        to = "super::service::Column::Id"
    )]
    Service,
    #[sea_orm(has_many = "super::payment_intent::Entity")]
    PaymentIntents,
}

impl Related<super::service::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Service.def()
    }
}

impl Related<super::payment_intent::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PaymentIntents.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
