//! Payment reconciler
//!
//! Turns gateway traffic into ledger commands. Browser callbacks and
//! webhooks may arrive zero, one or many times and in any order; every
//! path is keyed by the gateway payment id and is safe to repeat.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};
use uuid::Uuid;

use super::ledger::{BookingLedger, PaymentOutcome, PaymentPreparation, MANUAL_PAYMENT_PREFIX};
use super::refunds::RefundRequest;
use crate::application::ports::{
    GatewayOrder, RefundStatus, SharedPaymentGateway, SharedSignatureVerifier, WebhookEvent,
};
use crate::domain::booking::Booking;
use crate::domain::payment::PaymentIntent;
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::shared::{retry_transient, RetryPolicy};

#[derive(Debug, Clone)]
pub struct ReconcilerSettings {
    /// Upper bound on any single gateway call
    pub gateway_timeout: Duration,
    pub refund_retry: RetryPolicy,
}

impl Default for ReconcilerSettings {
    fn default() -> Self {
        Self {
            gateway_timeout: Duration::from_secs(10),
            refund_retry: RetryPolicy::default(),
        }
    }
}

/// Result of a webhook delivery, reported back to the gateway as 200
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WebhookOutcome {
    Applied,
    Duplicate,
    Ignored(String),
}

impl WebhookOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Applied => "applied",
            Self::Duplicate => "duplicate",
            Self::Ignored(_) => "ignored",
        }
    }
}

pub struct PaymentReconciler {
    ledger: Arc<BookingLedger>,
    repos: Arc<dyn RepositoryProvider>,
    gateway: SharedPaymentGateway,
    callback_verifier: SharedSignatureVerifier,
    webhook_verifier: SharedSignatureVerifier,
    settings: ReconcilerSettings,
}

impl PaymentReconciler {
    pub fn new(
        ledger: Arc<BookingLedger>,
        repos: Arc<dyn RepositoryProvider>,
        gateway: SharedPaymentGateway,
        callback_verifier: SharedSignatureVerifier,
        webhook_verifier: SharedSignatureVerifier,
        settings: ReconcilerSettings,
    ) -> Self {
        Self {
            ledger,
            repos,
            gateway,
            callback_verifier,
            webhook_verifier,
            settings,
        }
    }

    pub fn gateway_name(&self) -> &'static str {
        self.gateway.name()
    }

    /// Return the booking's open payment intent, creating a gateway order
    /// if there is none. A gateway timeout leaves nothing behind; the
    /// customer may simply ask again.
    pub async fn create_intent(&self, booking_id: Uuid) -> DomainResult<PaymentIntent> {
        match self.ledger.request_payment(booking_id).await? {
            PaymentPreparation::Existing(intent) => Ok(intent),
            PaymentPreparation::NeedsOrder(booking) => {
                let order = self.create_order(&booking).await?;
                self.ledger.attach_intent(booking_id, order).await
            }
        }
    }

    /// Browser-side payment callback. The signature covers
    /// `"{order_id}|{payment_id}"`.
    pub async fn handle_callback(
        &self,
        gateway_order_id: &str,
        gateway_payment_id: &str,
        signature: &str,
    ) -> DomainResult<PaymentOutcome> {
        let Some(intent) = self
            .repos
            .payment_intents()
            .find_by_order_id(gateway_order_id)
            .await?
        else {
            metrics::counter!("payment_callbacks_total", "outcome" => "unknown").increment(1);
            warn!(order_id = gateway_order_id, "Callback for unknown order");
            return Err(DomainError::stale(format!("unknown order {}", gateway_order_id)));
        };

        let payload = format!("{}|{}", gateway_order_id, gateway_payment_id);
        let verified = self.callback_verifier.verify(payload.as_bytes(), signature);

        let result = self
            .ledger
            .apply_payment_result(intent.booking_id, intent.id, gateway_payment_id, verified)
            .await;
        record_outcome(&result);
        result
    }

    /// Gateway webhook. The signature covers the raw body. Stale events
    /// are acknowledged as ignored so the gateway stops redelivering.
    pub async fn handle_webhook(&self, payload: &[u8], signature: &str) -> DomainResult<WebhookOutcome> {
        if !self.webhook_verifier.verify(payload, signature) {
            warn!("Webhook signature rejected");
            return Err(DomainError::Unauthorized("invalid webhook signature".into()));
        }
        let event = self.gateway.parse_webhook(payload)?;
        debug!(?event, "Webhook received");

        let outcome = match event {
            WebhookEvent::PaymentCaptured {
                order_id,
                payment_id,
            } => {
                let intent = self.intent_for_order(&order_id).await?;
                let result = self
                    .ledger
                    .apply_payment_result(intent.booking_id, intent.id, &payment_id, true)
                    .await;
                record_outcome(&result);
                match result {
                    Ok(PaymentOutcome::Confirmed(_)) => WebhookOutcome::Applied,
                    Ok(PaymentOutcome::AlreadyApplied(_)) => WebhookOutcome::Duplicate,
                    Ok(PaymentOutcome::VerificationFailed(_)) => {
                        WebhookOutcome::Ignored("verification failed".into())
                    }
                    Err(DomainError::StaleOrUnknownPayment(reason)) => WebhookOutcome::Ignored(reason),
                    Err(e) => return Err(e),
                }
            }
            WebhookEvent::PaymentAuthorized { order_id, .. } => {
                let intent = self.intent_for_order(&order_id).await?;
                if self.ledger.record_authorization(intent.id).await? {
                    WebhookOutcome::Applied
                } else {
                    WebhookOutcome::Duplicate
                }
            }
            WebhookEvent::PaymentFailed {
                order_id,
                payment_id,
                reason,
            } => {
                let intent = self.intent_for_order(&order_id).await?;
                debug!(%order_id, %payment_id, "Payment failure reported");
                if self.ledger.record_payment_failure(intent.id, reason).await? {
                    WebhookOutcome::Applied
                } else {
                    WebhookOutcome::Duplicate
                }
            }
            WebhookEvent::RefundProcessed {
                payment_id,
                refund_id,
            } => {
                let intent = self
                    .repos
                    .payment_intents()
                    .find_by_payment_id(&payment_id)
                    .await?
                    .ok_or_else(|| DomainError::stale(format!("unknown payment {}", payment_id)))?;
                if self
                    .ledger
                    .confirm_refund(intent.booking_id, &payment_id, &refund_id)
                    .await?
                {
                    WebhookOutcome::Applied
                } else {
                    WebhookOutcome::Duplicate
                }
            }
            WebhookEvent::Other(name) => WebhookOutcome::Ignored(format!("unhandled event {}", name)),
        };
        Ok(outcome)
    }

    /// Ask the gateway to return a captured payment. Transient gateway
    /// errors are retried with backoff. Payments recorded by an
    /// administrator were settled offline and are refunded the same way.
    pub async fn initiate_refund(&self, request: &RefundRequest) -> DomainResult<()> {
        let booking_id = request.booking_id;
        let payment_id = request.gateway_payment_id.as_str();

        if payment_id.starts_with(MANUAL_PAYMENT_PREFIX) {
            info!(%booking_id, "Manual payment, refund settled offline");
            self.ledger
                .confirm_refund(booking_id, payment_id, "offline")
                .await?;
            return Ok(());
        }

        let amount = request.amount;
        let receipt = retry_transient(&self.settings.refund_retry, "gateway.refund", || async move {
            self.with_timeout(self.gateway.refund(payment_id, amount)).await
        })
        .await?;

        metrics::counter!("refunds_total", "outcome" => "requested").increment(1);
        match receipt.status {
            RefundStatus::Processed => {
                self.ledger
                    .confirm_refund(booking_id, payment_id, &receipt.refund_id)
                    .await?;
            }
            RefundStatus::Pending => {
                info!(
                    %booking_id,
                    refund_id = %receipt.refund_id,
                    "Refund accepted, waiting for gateway confirmation"
                );
            }
        }
        Ok(())
    }

    async fn create_order(&self, booking: &Booking) -> DomainResult<GatewayOrder> {
        let reference = booking.id.to_string();
        let order = self
            .with_timeout(
                self.gateway
                    .create_order(booking.total_amount, &booking.currency, &reference),
            )
            .await
            .map_err(|e| {
                warn!(booking_id = %booking.id, error = %e, "Gateway order creation failed");
                e
            })?;
        info!(booking_id = %booking.id, order_id = %order.order_id, "Gateway order created");
        Ok(order)
    }

    async fn with_timeout<T>(
        &self,
        call: impl std::future::Future<Output = DomainResult<T>>,
    ) -> DomainResult<T> {
        match tokio::time::timeout(self.settings.gateway_timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(DomainError::GatewayTimeout),
        }
    }

    async fn intent_for_order(&self, order_id: &str) -> DomainResult<PaymentIntent> {
        self.repos
            .payment_intents()
            .find_by_order_id(order_id)
            .await?
            .ok_or_else(|| DomainError::stale(format!("unknown order {}", order_id)))
    }
}

fn record_outcome(result: &DomainResult<PaymentOutcome>) {
    let outcome = match result {
        Ok(PaymentOutcome::Confirmed(_)) => "confirmed",
        Ok(PaymentOutcome::AlreadyApplied(_)) => "duplicate",
        Ok(PaymentOutcome::VerificationFailed(_)) => "verification_failed",
        Err(DomainError::StaleOrUnknownPayment(_)) => "stale",
        Err(_) => "error",
    };
    metrics::counter!("payment_callbacks_total", "outcome" => outcome).increment(1);
}
