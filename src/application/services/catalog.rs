//! Service catalog
//!
//! Read-mostly registry of bookable offerings. Administrators publish and
//! edit offerings; bookings only ever read them.

use std::sync::Arc;

use tracing::info;

use crate::domain::service::{NewServiceOffering, ServiceCategory, ServiceOffering};
use crate::domain::{DomainError, DomainResult, RepositoryProvider};
use crate::shared::SharedClock;

const MAX_DURATION_MINUTES: u32 = 24 * 60;

pub struct ServiceCatalog {
    repos: Arc<dyn RepositoryProvider>,
    clock: SharedClock,
}

impl ServiceCatalog {
    pub fn new(repos: Arc<dyn RepositoryProvider>, clock: SharedClock) -> Self {
        Self { repos, clock }
    }

    pub async fn get(&self, id: i32) -> DomainResult<ServiceOffering> {
        self.repos
            .services()
            .find_by_id(id)
            .await?
            .ok_or(DomainError::ServiceNotFound(id))
    }

    /// Like [`get`](Self::get) but unpublished offerings are not found.
    pub async fn get_active(&self, id: i32) -> DomainResult<ServiceOffering> {
        let offering = self.get(id).await?;
        if !offering.is_active {
            return Err(DomainError::ServiceNotFound(id));
        }
        Ok(offering)
    }

    pub async fn list(&self, active_only: bool) -> DomainResult<Vec<ServiceOffering>> {
        let all = self.repos.services().find_all().await?;
        Ok(all
            .into_iter()
            .filter(|s| !active_only || s.is_active)
            .collect())
    }

    pub async fn create(&self, offering: NewServiceOffering) -> DomainResult<ServiceOffering> {
        validate(&offering)?;
        let created = self.repos.services().create(offering).await?;
        info!(service_id = created.id, name = %created.name, price = created.price, "Service published");
        Ok(created)
    }

    /// Replace the editable fields of an offering. Existing bookings keep
    /// the price they were created with.
    pub async fn update(&self, id: i32, changes: NewServiceOffering) -> DomainResult<ServiceOffering> {
        validate(&changes)?;
        let existing = self.get(id).await?;
        let mut updated = changes.into_offering(id, existing.created_at);
        updated.is_active = existing.is_active;
        updated.updated_at = self.clock.now();
        self.repos.services().update(updated.clone()).await?;
        info!(service_id = id, price = updated.price, "Service updated");
        Ok(updated)
    }

    pub async fn set_active(&self, id: i32, active: bool) -> DomainResult<ServiceOffering> {
        let mut offering = self.get(id).await?;
        offering.is_active = active;
        offering.updated_at = self.clock.now();
        self.repos.services().update(offering.clone()).await?;
        info!(service_id = id, active, "Service availability changed");
        Ok(offering)
    }

    /// Publish the default offerings if the catalog is empty. Returns how
    /// many were inserted.
    pub async fn seed_defaults(&self) -> DomainResult<usize> {
        if self.repos.services().count().await? > 0 {
            return Ok(0);
        }
        let defaults = default_offerings();
        let n = defaults.len();
        for offering in defaults {
            self.repos.services().create(offering).await?;
        }
        info!(count = n, "Seeded default service catalog");
        Ok(n)
    }
}

fn validate(offering: &NewServiceOffering) -> DomainResult<()> {
    if offering.name.trim().is_empty() {
        return Err(DomainError::Validation("service name is required".into()));
    }
    if offering.price <= 0 {
        return Err(DomainError::Validation("price must be positive".into()));
    }
    if offering.duration_minutes == 0 || offering.duration_minutes > MAX_DURATION_MINUTES {
        return Err(DomainError::Validation(format!(
            "duration must be between 1 and {} minutes",
            MAX_DURATION_MINUTES
        )));
    }
    Ok(())
}

fn offering(
    name: &str,
    description: &str,
    category: ServiceCategory,
    rupees: i64,
    duration_minutes: u32,
    features: &[&str],
    is_popular: bool,
) -> NewServiceOffering {
    NewServiceOffering {
        name: name.to_string(),
        description: description.to_string(),
        category,
        price: rupees * 100,
        duration_minutes,
        features: features.iter().map(|f| f.to_string()).collect(),
        is_popular,
    }
}

fn default_offerings() -> Vec<NewServiceOffering> {
    vec![
        offering(
            "Wedding Photography",
            "Complete wedding photography package with pre-wedding, ceremony, and reception coverage",
            ServiceCategory::Photography,
            50_000,
            600,
            &["Pre-wedding consultation", "Full day coverage", "High-resolution edited photos", "Online gallery", "Print release"],
            true,
        ),
        offering(
            "Portrait Session",
            "Professional portrait photography for individuals, couples, or families",
            ServiceCategory::Photography,
            8_000,
            120,
            &["Studio or outdoor location", "20-30 edited photos", "Online gallery", "Print release", "Wardrobe consultation"],
            false,
        ),
        offering(
            "Event Photography",
            "Corporate events, parties, and special occasions photography",
            ServiceCategory::Photography,
            25_000,
            360,
            &["Event coverage", "Candid and posed shots", "Quick turnaround", "Online gallery", "High-resolution images"],
            false,
        ),
        offering(
            "Product Photography",
            "Professional product photography for e-commerce and marketing",
            ServiceCategory::Photography,
            5_000,
            180,
            &["Multiple angles", "White background", "Lifestyle shots", "High-resolution images", "Quick delivery"],
            false,
        ),
        offering(
            "Wedding Videography",
            "Cinematic wedding videography with highlight reel and full ceremony",
            ServiceCategory::Videography,
            75_000,
            600,
            &["Cinematic highlights", "Full ceremony recording", "Drone footage (if permitted)", "4K quality", "Music and editing"],
            true,
        ),
        offering(
            "Commercial Photography",
            "Professional photography for businesses, marketing, and branding",
            ServiceCategory::Photography,
            15_000,
            240,
            &["Brand-focused shots", "Team photography", "Office/location shots", "Marketing materials", "Commercial license"],
            false,
        ),
    ]
}
