//! Razorpay REST client
//!
//! Orders: `POST /v1/orders`. Refunds: `POST /v1/payments/{id}/refund`.
//! Both authenticate with HTTP basic auth (`key_id:key_secret`).

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::application::ports::{
    GatewayOrder, PaymentGateway, RefundReceipt, RefundStatus, WebhookEvent,
};
use crate::domain::{DomainError, DomainResult};
use crate::shared::errors::InfraError;

#[derive(Debug, Clone)]
pub struct RazorpayConfig {
    pub key_id: String,
    pub key_secret: String,
    pub base_url: String,
    pub timeout: Duration,
}

pub struct RazorpayGateway {
    client: reqwest::Client,
    config: RazorpayConfig,
}

impl RazorpayGateway {
    pub fn new(config: RazorpayConfig) -> DomainResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| DomainError::GatewayError(format!("failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> DomainResult<R> {
        let response = self
            .client
            .post(self.url(path))
            .basic_auth(&self.config.key_id, Some(&self.config.key_secret))
            .json(body)
            .send()
            .await
            .map_err(InfraError::from)?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            warn!(%status, path, body = %text, "Gateway rejected request");
            return Err(classify(status, text));
        }
        Ok(response.json::<R>().await.map_err(InfraError::from)?)
    }
}

fn classify(status: StatusCode, body: String) -> DomainError {
    if status == StatusCode::GATEWAY_TIMEOUT || status == StatusCode::REQUEST_TIMEOUT {
        DomainError::GatewayTimeout
    } else {
        DomainError::GatewayError(format!("{}: {}", status, body))
    }
}

#[derive(Serialize)]
struct CreateOrderRequest<'a> {
    amount: i64,
    currency: &'a str,
    receipt: &'a str,
}

#[derive(Deserialize)]
struct OrderResponse {
    id: String,
    amount: i64,
    currency: String,
}

#[derive(Serialize)]
struct RefundRequestBody {
    amount: i64,
}

#[derive(Deserialize)]
struct RefundResponse {
    id: String,
    status: String,
}

#[async_trait]
impl PaymentGateway for RazorpayGateway {
    fn name(&self) -> &'static str {
        "razorpay"
    }

    async fn create_order(
        &self,
        amount: i64,
        currency: &str,
        reference: &str,
    ) -> DomainResult<GatewayOrder> {
        let order: OrderResponse = self
            .post(
                "/v1/orders",
                &CreateOrderRequest {
                    amount,
                    currency,
                    receipt: reference,
                },
            )
            .await?;
        debug!(order_id = %order.id, amount, "Razorpay order created");
        Ok(GatewayOrder {
            order_id: order.id,
            amount: order.amount,
            currency: order.currency,
        })
    }

    async fn refund(&self, gateway_payment_id: &str, amount: i64) -> DomainResult<RefundReceipt> {
        let path = format!("/v1/payments/{}/refund", gateway_payment_id);
        let refund: RefundResponse = self.post(&path, &RefundRequestBody { amount }).await?;
        let status = match refund.status.as_str() {
            "processed" => RefundStatus::Processed,
            "pending" | "created" => RefundStatus::Pending,
            other => {
                return Err(DomainError::GatewayError(format!(
                    "refund {} is {}",
                    refund.id, other
                )))
            }
        };
        Ok(RefundReceipt {
            refund_id: refund.id,
            status,
        })
    }

    fn parse_webhook(&self, payload: &[u8]) -> DomainResult<WebhookEvent> {
        parse_razorpay_webhook(payload)
    }
}

#[derive(Deserialize)]
struct WebhookEnvelope {
    event: String,
    #[serde(default)]
    payload: WebhookPayload,
}

#[derive(Deserialize, Default)]
struct WebhookPayload {
    payment: Option<Entity<PaymentEntity>>,
    refund: Option<Entity<RefundEntity>>,
}

#[derive(Deserialize)]
struct Entity<T> {
    entity: T,
}

#[derive(Deserialize)]
struct PaymentEntity {
    id: String,
    order_id: Option<String>,
    error_description: Option<String>,
}

#[derive(Deserialize)]
struct RefundEntity {
    id: String,
    payment_id: String,
}

/// Decode a Razorpay webhook body.
pub fn parse_razorpay_webhook(payload: &[u8]) -> DomainResult<WebhookEvent> {
    let envelope: WebhookEnvelope = serde_json::from_slice(payload)
        .map_err(|e| DomainError::Validation(format!("malformed webhook: {}", e)))?;

    let payment = |envelope: WebhookEnvelope| -> DomainResult<(String, String, Option<String>)> {
        let entity = envelope
            .payload
            .payment
            .ok_or_else(|| DomainError::Validation("webhook has no payment entity".into()))?
            .entity;
        let order_id = entity
            .order_id
            .ok_or_else(|| DomainError::Validation("payment has no order_id".into()))?;
        Ok((order_id, entity.id, entity.error_description))
    };

    let event = envelope.event.clone();
    match event.as_str() {
        "payment.authorized" => {
            let (order_id, payment_id, _) = payment(envelope)?;
            Ok(WebhookEvent::PaymentAuthorized {
                order_id,
                payment_id,
            })
        }
        "payment.captured" | "order.paid" => {
            let (order_id, payment_id, _) = payment(envelope)?;
            Ok(WebhookEvent::PaymentCaptured {
                order_id,
                payment_id,
            })
        }
        "payment.failed" => {
            let (order_id, payment_id, reason) = payment(envelope)?;
            Ok(WebhookEvent::PaymentFailed {
                order_id,
                payment_id,
                reason,
            })
        }
        "refund.processed" => {
            let refund = envelope
                .payload
                .refund
                .ok_or_else(|| DomainError::Validation("webhook has no refund entity".into()))?
                .entity;
            Ok(WebhookEvent::RefundProcessed {
                payment_id: refund.payment_id,
                refund_id: refund.id,
            })
        }
        other => Ok(WebhookEvent::Other(other.to_string())),
    }
}
