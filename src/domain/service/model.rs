//! Service offering entity

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Offering category
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceCategory {
    Photography,
    Videography,
    Editing,
    Other,
}

impl ServiceCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Photography => "photography",
            Self::Videography => "videography",
            Self::Editing => "editing",
            Self::Other => "other",
        }
    }

    pub fn from_str(s: &str) -> Self {
        match s {
            "photography" => Self::Photography,
            "videography" => Self::Videography,
            "editing" => Self::Editing,
            _ => Self::Other,
        }
    }
}

impl std::fmt::Display for ServiceCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bookable offering. Bookings snapshot `price` at creation and never
/// read it again.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceOffering {
    pub id: i32,
    pub name: String,
    pub description: String,
    pub category: ServiceCategory,
    /// Price in minor currency units
    pub price: i64,
    /// Length of the session the crew is booked for
    pub duration_minutes: u32,
    pub features: Vec<String>,
    pub is_popular: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ServiceOffering {
    pub fn duration(&self) -> Duration {
        Duration::minutes(i64::from(self.duration_minutes))
    }
}

/// Administrator input for publishing or editing an offering.
#[derive(Debug, Clone)]
pub struct NewServiceOffering {
    pub name: String,
    pub description: String,
    pub category: ServiceCategory,
    pub price: i64,
    pub duration_minutes: u32,
    pub features: Vec<String>,
    pub is_popular: bool,
}

impl NewServiceOffering {
    pub fn into_offering(self, id: i32, now: DateTime<Utc>) -> ServiceOffering {
        ServiceOffering {
            id,
            name: self.name,
            description: self.description,
            category: self.category,
            price: self.price,
            duration_minutes: self.duration_minutes,
            features: self.features,
            is_popular: self.is_popular,
            is_active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
