//! Shared router state
//!
//! One `AppState` carries the application services; handlers that need
//! less pull their own slice through `FromRef`.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use chrono::NaiveTime;
use sea_orm::DatabaseConnection;

use super::middleware::AuthState;
use crate::application::{BookingLedger, PaymentReconciler};

/// Configured administrator account
#[derive(Debug, Clone)]
pub struct AdminCredentials {
    pub username: String,
    /// bcrypt hash
    pub password_hash: String,
}

/// Window used when suggesting alternative start times
#[derive(Debug, Clone, Copy)]
pub struct BusinessHours {
    pub opening: NaiveTime,
    pub closing: NaiveTime,
    pub step_minutes: u32,
}

impl Default for BusinessHours {
    fn default() -> Self {
        Self {
            opening: NaiveTime::from_hms_opt(8, 0, 0).unwrap_or(NaiveTime::MIN),
            closing: NaiveTime::from_hms_opt(22, 0, 0).unwrap_or(NaiveTime::MIN),
            step_minutes: 30,
        }
    }
}

/// Health check state
#[derive(Clone)]
pub struct HealthState {
    /// `None` when running on the in-memory backend
    pub db: Option<DatabaseConnection>,
    pub started_at: Arc<Instant>,
}

#[derive(Clone)]
pub struct AppState {
    pub ledger: Arc<BookingLedger>,
    pub reconciler: Arc<PaymentReconciler>,
    pub auth: AuthState,
    pub admin: Arc<AdminCredentials>,
    pub business_hours: BusinessHours,
    /// Public key handed to the checkout widget; never the secret
    pub gateway_key_id: Option<String>,
    pub health: HealthState,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(s: &AppState) -> Self {
        s.auth.clone()
    }
}

impl FromRef<AppState> for HealthState {
    fn from_ref(s: &AppState) -> Self {
        s.health.clone()
    }
}
