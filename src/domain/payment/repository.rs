//! Payment intent repository interface

use async_trait::async_trait;
use uuid::Uuid;

use super::model::PaymentIntent;
use crate::domain::DomainResult;

#[async_trait]
pub trait PaymentIntentRepository: Send + Sync {
    /// Insert or replace by `intent.id`
    async fn save(&self, intent: PaymentIntent) -> DomainResult<()>;

    async fn find_by_id(&self, id: Uuid) -> DomainResult<Option<PaymentIntent>>;

    async fn find_by_order_id(&self, gateway_order_id: &str) -> DomainResult<Option<PaymentIntent>>;

    async fn find_by_payment_id(&self, gateway_payment_id: &str)
        -> DomainResult<Option<PaymentIntent>>;

    /// All intents for a booking, oldest first
    async fn find_by_booking(&self, booking_id: Uuid) -> DomainResult<Vec<PaymentIntent>>;
}
