//! Mock payment gateway for development and testing
//!
//! Creates orders locally and refunds instantly. Failures and latency can
//! be scripted. Webhooks use the Razorpay body format.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::Mutex;
use tracing::info;

use super::razorpay::parse_razorpay_webhook;
use crate::application::ports::{
    GatewayOrder, PaymentGateway, RefundReceipt, RefundStatus, WebhookEvent,
};
use crate::domain::{DomainError, DomainResult};

pub struct MockPaymentGateway {
    next_id: AtomicU64,
    latency: Option<Duration>,
    refund_status: RefundStatus,
    failures: Mutex<VecDeque<DomainError>>,
    refunds: Mutex<Vec<(String, i64)>>,
}

impl MockPaymentGateway {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            latency: None,
            refund_status: RefundStatus::Processed,
            failures: Mutex::new(VecDeque::new()),
            refunds: Mutex::new(Vec::new()),
        }
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Sleep this long inside every call
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Status reported for refunds (default `Processed`)
    pub fn with_refund_status(mut self, status: RefundStatus) -> Self {
        self.refund_status = status;
        self
    }

    /// The next call fails with `error`. Queued failures are consumed in
    /// order.
    pub async fn fail_next(&self, error: DomainError) {
        self.failures.lock().await.push_back(error);
    }

    /// `(payment_id, amount)` of every refund issued so far
    pub async fn refunds(&self) -> Vec<(String, i64)> {
        self.refunds.lock().await.clone()
    }

    async fn simulate(&self) -> DomainResult<u64> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        if let Some(error) = self.failures.lock().await.pop_front() {
            return Err(error);
        }
        Ok(self.next_id.fetch_add(1, Ordering::SeqCst))
    }
}

impl Default for MockPaymentGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PaymentGateway for MockPaymentGateway {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        reference: &str,
    ) -> DomainResult<GatewayOrder> {
        let n = self.simulate().await?;
        let order_id = format!("order_mock_{}", n);
        info!(%order_id, amount, currency, reference, "Mock order created");
        Ok(GatewayOrder {
            order_id,
            amount,
            currency: currency.to_string(),
        })
    }

    async fn refund(&self, gateway_payment_id: &str, amount: i64) -> DomainResult<RefundReceipt> {
        let n = self.simulate().await?;
        self.refunds
            .lock()
            .await
            .push((gateway_payment_id.to_string(), amount));
        let refund_id = format!("rfnd_mock_{}", n);
        info!(payment_id = gateway_payment_id, amount, %refund_id, "Mock refund issued");
        Ok(RefundReceipt {
            refund_id,
            status: self.refund_status,
        })
    }

    fn parse_webhook(&self, payload: &[u8]) -> DomainResult<WebhookEvent> {
        parse_razorpay_webhook(payload)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn orders_get_distinct_ids() {
        let gateway = MockPaymentGateway::new();
        let a = gateway.create_order(5000, "INR", "b1").await.unwrap();
        let b = gateway.create_order(5000, "INR", "b2").await.unwrap();
        assert_ne!(a.order_id, b.order_id);
        assert_eq!(a.amount, 5000);
    }

    #[tokio::test]
    async fn scripted_failure_is_consumed_once() {
        let gateway = MockPaymentGateway::new();
        gateway.fail_next(DomainError::GatewayTimeout).await;
        assert!(matches!(
            gateway.refund("pay_1", 100).await,
            Err(DomainError::GatewayTimeout)
        ));
        assert!(gateway.refund("pay_1", 100).await.is_ok());
        assert_eq!(gateway.refunds().await, vec![("pay_1".to_string(), 100)]);
    }
}
