//! Availability DTOs

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::reservation::Reservation;

#[derive(Debug, Deserialize, IntoParams)]
pub struct AvailabilityQuery {
    /// Day to inspect (YYYY-MM-DD)
    pub date: NaiveDate,
    /// Offering whose duration is used for suggestions and checks
    pub service_id: Option<i32>,
    /// Start time to check (HH:MM); requires `service_id`
    pub start_time: Option<String>,
}

/// A window already taken on the calendar
#[derive(Debug, Serialize, ToSchema)]
pub struct BusyWindow {
    pub start_time: String,
    pub end_time: String,
    /// held or committed
    pub state: String,
}

impl From<&Reservation> for BusyWindow {
    fn from(r: &Reservation) -> Self {
        Self {
            start_time: r.slot.start_time.format("%H:%M").to_string(),
            end_time: r.slot.end_time().format("%H:%M").to_string(),
            state: r.state.as_str().to_string(),
        }
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvailabilityResponse {
    pub date: NaiveDate,
    pub busy: Vec<BusyWindow>,
    /// Free start times for the requested service within business hours
    pub suggested_start_times: Vec<String>,
    /// Present when `start_time` was given
    pub requested_available: Option<bool>,
}
