//! Payment intent entity

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentStatus {
    Created,
    Authorized,
    Captured,
    Failed,
    VerificationFailed,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Authorized => "authorized",
            Self::Captured => "captured",
            Self::Failed => "failed",
            Self::VerificationFailed => "verification_failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "created" => Some(Self::Created),
            "authorized" => Some(Self::Authorized),
            "captured" => Some(Self::Captured),
            "failed" => Some(Self::Failed),
            "verification_failed" => Some(Self::VerificationFailed),
            _ => None,
        }
    }

    /// Still waiting for a successful payment
    pub fn is_open(&self) -> bool {
        matches!(
            self,
            Self::Created | Self::Authorized | Self::VerificationFailed
        )
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One attempt to collect payment for a booking through the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaymentIntent {
    pub id: Uuid,
    pub booking_id: Uuid,
    pub amount: i64,
    pub currency: String,
    pub gateway_order_id: String,
    /// Set once the gateway reports a payment against the order
    pub gateway_payment_id: Option<String>,
    pub status: IntentStatus,
    pub refund_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PaymentIntent {
    pub fn new(
        booking_id: Uuid,
        amount: i64,
        currency: impl Into<String>,
        gateway_order_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            booking_id,
            amount,
            currency: currency.into(),
            gateway_order_id: gateway_order_id.into(),
            gateway_payment_id: None,
            status: IntentStatus::Created,
            refund_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn mark(&mut self, status: IntentStatus, now: DateTime<Utc>) {
        self.status = status;
        self.updated_at = now;
    }
}
