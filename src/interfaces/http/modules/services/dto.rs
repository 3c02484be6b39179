//! Service offering DTOs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::domain::service::{NewServiceOffering, ServiceCategory, ServiceOffering};

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ServiceResponse {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: String,
    /// Minor currency units
    pub price: i64,
    pub duration_minutes: u32,
    pub features: Vec<String>,
    pub is_popular: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<ServiceOffering> for ServiceResponse {
    fn from(s: ServiceOffering) -> Self {
        Self {
            id: s.id,
            name: s.name,
            description: s.description,
            category: s.category.to_string(),
            price: s.price,
            duration_minutes: s.duration_minutes,
            features: s.features,
            is_popular: s.is_popular,
            is_active: s.is_active,
            created_at: s.created_at,
            updated_at: s.updated_at,
        }
    }
}

#[derive(Debug, Deserialize, IntoParams)]
pub struct ServiceListQuery {
    /// Include deactivated offerings (admin views)
    #[serde(default)]
    pub include_inactive: bool,
}

#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ServiceRequest {
    #[validate(length(min = 1, max = 100, message = "service name is required"))]
    pub name: String,
    #[serde(default)]
    #[validate(length(max = 2000))]
    pub description: String,
    /// photography, videography, editing, other
    pub category: String,
    #[validate(range(min = 1, message = "price must be positive"))]
    pub price: i64,
    #[validate(range(min = 1, max = 1440, message = "duration must be 1-1440 minutes"))]
    pub duration_minutes: u32,
    #[serde(default)]
    pub features: Vec<String>,
    #[serde(default)]
    pub is_popular: bool,
    /// Only honoured on update
    pub is_active: Option<bool>,
}

impl ServiceRequest {
    pub fn to_new_offering(&self) -> NewServiceOffering {
        NewServiceOffering {
            name: self.name.trim().to_string(),
            description: self.description.clone(),
            category: ServiceCategory::from_str(&self.category),
            price: self.price,
            duration_minutes: self.duration_minutes,
            features: self.features.clone(),
            is_popular: self.is_popular,
        }
    }
}
