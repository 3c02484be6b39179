//! Outbound ports: payment gateway and signature verification

use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::DomainResult;

/// Order registered with the gateway for one payment attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GatewayOrder {
    pub order_id: String,
    pub amount: i64,
    pub currency: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RefundStatus {
    /// Money is on its way back
    Processed,
    /// Accepted; a `refund.processed` webhook follows
    Pending,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RefundReceipt {
    pub refund_id: String,
    pub status: RefundStatus,
}

/// Gateway notification, already authenticated and decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookEvent {
    PaymentAuthorized {
        order_id: String,
        payment_id: String,
    },
    PaymentCaptured {
        order_id: String,
        payment_id: String,
    },
    PaymentFailed {
        order_id: String,
        payment_id: String,
        reason: Option<String>,
    },
    RefundProcessed {
        payment_id: String,
        refund_id: String,
    },
    /// An event type the booking core does not act on
    Other(String),
}

/// Payment processor collaborator.
///
/// Implementations must bound their own network time; the reconciler
/// additionally wraps calls in a timeout.
#[async_trait]
pub trait PaymentGateway: Send + Sync {
    fn name(&self) -> &'static str;

    /// Register an order for `amount` minor units. `reference` is our
    /// booking id, echoed back by the gateway as the receipt.
    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        reference: &str,
    ) -> DomainResult<GatewayOrder>;

    /// Refund a captured payment in full
    async fn refund(&self, gateway_payment_id: &str, amount: i64) -> DomainResult<RefundReceipt>;

    /// Decode a webhook body in this gateway's format
    fn parse_webhook(&self, payload: &[u8]) -> DomainResult<WebhookEvent>;
}

/// Authenticity check for gateway-signed payloads.
pub trait SignatureVerifier: Send + Sync {
    fn verify(&self, payload: &[u8], signature: &str) -> bool;
}

pub type SharedPaymentGateway = Arc<dyn PaymentGateway>;
pub type SharedSignatureVerifier = Arc<dyn SignatureVerifier>;
