//! Reservation entity
//!
//! Durable mirror of the in-memory calendar, one row per booking.

use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "reservations")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub booking_id: Uuid,

    pub service_offering_id: i32,
    pub event_date: Date,
    pub start_time: Time,
    pub duration_minutes: i32,

    /// held or committed
    pub state: String,

    /// Hold deadline; null once committed
    pub expires_at: Option<DateTimeUtc>,

    pub created_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
