//! SeaORM implementation of ServiceRepository

use async_trait::async_trait;
use sea_orm::{
    ActiveModelTrait, ActiveValue::NotSet, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryOrder, Set,
};
use tracing::debug;

use super::db_err;
use crate::domain::service::{NewServiceOffering, ServiceCategory, ServiceOffering, ServiceRepository};
use crate::domain::{DomainError, DomainResult};
use crate::infrastructure::database::entities::service;
use crate::shared::SharedClock;

pub struct SeaOrmServiceRepository {
    db: DatabaseConnection,
    clock: SharedClock,
}

impl SeaOrmServiceRepository {
    pub fn new(db: DatabaseConnection, clock: SharedClock) -> Self {
        Self { db, clock }
    }
}

// ── Conversion helpers ──────────────────────────────────────────

fn model_to_domain(m: service::Model) -> DomainResult<ServiceOffering> {
    let features: Vec<String> = serde_json::from_str(&m.features).map_err(|e| {
        DomainError::InvariantViolation(format!("service {} has malformed features: {}", m.id, e))
    })?;
    Ok(ServiceOffering {
        id: m.id,
        name: m.name,
        description: m.description,
        category: ServiceCategory::from_str(&m.category),
        price: m.price,
        duration_minutes: m.duration_minutes.max(0) as u32,
        features,
        is_popular: m.is_popular,
        is_active: m.is_active,
        created_at: m.created_at,
        updated_at: m.updated_at,
    })
}

fn features_json(features: &[String]) -> DomainResult<String> {
    serde_json::to_string(features).map_err(|e| DomainError::Validation(e.to_string()))
}

// ── ServiceRepository impl ──────────────────────────────────────

#[async_trait]
impl ServiceRepository for SeaOrmServiceRepository {
    async fn find_by_id(&self, id: i32) -> DomainResult<Option<ServiceOffering>> {
        service::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .map(model_to_domain)
            .transpose()
    }

    async fn find_all(&self) -> DomainResult<Vec<ServiceOffering>> {
        service::Entity::find()
            .order_by_asc(service::Column::Id)
            .all(&self.db)
            .await
            .map_err(db_err)?
            .into_iter()
            .map(model_to_domain)
            .collect()
    }

    async fn create(&self, offering: NewServiceOffering) -> DomainResult<ServiceOffering> {
        debug!(name = %offering.name, "Creating service offering");
        let now = self.clock.now();

        let model = service::ActiveModel {
            id: NotSet,
            name: Set(offering.name.clone()),
            description: Set(offering.description.clone()),
            category: Set(offering.category.as_str().to_string()),
            price: Set(offering.price),
            duration_minutes: Set(offering.duration_minutes as i32),
            features: Set(features_json(&offering.features)?),
            is_popular: Set(offering.is_popular),
            is_active: Set(true),
            created_at: Set(now),
            updated_at: Set(now),
        };
        let inserted = model.insert(&self.db).await.map_err(db_err)?;
        Ok(offering.into_offering(inserted.id, now))
    }

    async fn update(&self, offering: ServiceOffering) -> DomainResult<()> {
        debug!(id = offering.id, "Updating service offering");

        let existing = service::Entity::find_by_id(offering.id)
            .one(&self.db)
            .await
            .map_err(db_err)?;
        if existing.is_none() {
            return Err(DomainError::ServiceNotFound(offering.id));
        }

        let model = service::ActiveModel {
            id: Set(offering.id),
            name: Set(offering.name),
            description: Set(offering.description),
            category: Set(offering.category.as_str().to_string()),
            price: Set(offering.price),
            duration_minutes: Set(offering.duration_minutes as i32),
            features: Set(features_json(&offering.features)?),
            is_popular: Set(offering.is_popular),
            is_active: Set(offering.is_active),
            created_at: Set(offering.created_at),
            updated_at: Set(offering.updated_at),
        };
        model.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn count(&self) -> DomainResult<u64> {
        service::Entity::find()
            .count(&self.db)
            .await
            .map_err(db_err)
    }
}
