//! Admin DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::booking::BookingStats;

#[derive(Debug, Deserialize, IntoParams)]
pub struct BookingListQuery {
    /// pending, confirmed, completed, cancelled
    pub status: Option<String>,
    /// unpaid, paid, refund_pending, refunded
    pub payment_status: Option<String>,
    pub date_from: Option<NaiveDate>,
    pub date_to: Option<NaiveDate>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct UpdateStatusRequest {
    /// confirmed, cancelled or completed
    pub status: String,
    /// Replaces the booking's admin notes when present
    #[validate(length(max = 2000))]
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub total: u64,
    pub pending: u64,
    pub confirmed: u64,
    pub completed: u64,
    pub cancelled: u64,
    pub refund_pending: u64,
    /// Minor currency units
    pub paid_revenue: i64,
}

impl From<BookingStats> for StatsResponse {
    fn from(s: BookingStats) -> Self {
        Self {
            total: s.total,
            pending: s.pending,
            confirmed: s.confirmed,
            completed: s.completed,
            cancelled: s.cancelled,
            refund_pending: s.refund_pending,
            paid_revenue: s.paid_revenue,
        }
    }
}
