//! Service offering repository interface

use async_trait::async_trait;

use super::model::{NewServiceOffering, ServiceOffering};
use crate::domain::DomainResult;

#[async_trait]
pub trait ServiceRepository: Send + Sync {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ServiceOffering>>;

    async fn find_all(&self) -> DomainResult<Vec<ServiceOffering>>;

    /// Insert a new offering and return it with its assigned ID
    async fn create(&self, offering: NewServiceOffering) -> DomainResult<ServiceOffering>;

    async fn update(&self, offering: ServiceOffering) -> DomainResult<()>;

    async fn count(&self) -> DomainResult<u64>;
}
