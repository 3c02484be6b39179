#![allow(dead_code)]

use std::sync::Arc;

use chrono::{NaiveDate, NaiveTime, TimeZone, Utc};
use serde_json::json;

use crate::application::{
    AvailabilityIndex, BookingLedger, NewBooking, PaymentReconciler, RefundWorker,
    ServiceCatalog, SharedPaymentGateway,
};
use crate::config::AppConfig;
use crate::domain::booking::{CustomerInfo, EventDetails};
use crate::domain::service::{NewServiceOffering, ServiceCategory};
use crate::domain::{Booking, RepositoryProvider};
use crate::infrastructure::crypto::HmacSha256Verifier;
use crate::infrastructure::{InMemoryRepositoryProvider, MockPaymentGateway};
use crate::interfaces::http::AppState;
use crate::server::AppComponents;
use crate::shared::{ManualClock, SharedClock};

pub const KEY_SECRET: &str = "test-key-secret";
pub const WEBHOOK_SECRET: &str = "test-webhook-secret";
pub const ADMIN_USER: &str = "owner";
pub const ADMIN_PASSWORD: &str = "s3cret-pass";
pub const PRICE: i64 = 5000;

pub fn config() -> AppConfig {
    let mut config = AppConfig::default();
    config.gateway.key_secret = KEY_SECRET.into();
    config.gateway.webhook_secret = WEBHOOK_SECRET.into();
    config.admin.username = ADMIN_USER.into();
    config.admin.password = None;
    config.admin.password_hash = Some(bcrypt::hash(ADMIN_PASSWORD, 4).unwrap());
    config
}

/// The whole engine on in-memory storage, a manual clock and the mock
/// gateway. The clock starts on 2024-02-01 09:00 UTC.
pub struct Harness {
    pub clock: ManualClock,
    pub repos: Arc<InMemoryRepositoryProvider>,
    pub gateway: Arc<MockPaymentGateway>,
    pub catalog: Arc<ServiceCatalog>,
    pub availability: Arc<AvailabilityIndex>,
    pub ledger: Arc<BookingLedger>,
    pub reconciler: Arc<PaymentReconciler>,
    pub refund_worker: RefundWorker,
    pub state: AppState,
    /// One-hour session priced 5000
    pub service_id: i32,
}

impl Harness {
    pub async fn new() -> Self {
        Self::with_gateway(MockPaymentGateway::new()).await
    }

    pub async fn with_gateway(gateway: MockPaymentGateway) -> Self {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2024, 2, 1, 9, 0, 0).unwrap());
        let shared: SharedClock = Arc::new(clock.clone());
        let repos = Arc::new(InMemoryRepositoryProvider::new(shared.clone()));
        let gateway = Arc::new(gateway);

        let provider: Arc<dyn RepositoryProvider> = repos.clone();
        let shared_gateway: SharedPaymentGateway = gateway.clone();
        let AppComponents {
            catalog,
            availability,
            ledger,
            reconciler,
            refund_worker,
            state,
            ..
        } = AppComponents::assemble(&config(), provider, shared_gateway, shared, None).unwrap();

        let service = catalog
            .create(NewServiceOffering {
                name: "Headshot Session".into(),
                description: "One hour studio headshots".into(),
                category: ServiceCategory::Photography,
                price: PRICE,
                duration_minutes: 60,
                features: vec!["10 edited photos".into()],
                is_popular: false,
            })
            .await
            .unwrap();

        Self {
            clock,
            repos,
            gateway,
            catalog,
            availability,
            ledger,
            reconciler,
            refund_worker,
            state,
            service_id: service.id,
        }
    }

    pub async fn create(&self, hour: u32) -> Booking {
        self.ledger.create(request(self.service_id, hour)).await.unwrap()
    }
}

pub fn event_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 2, 10).unwrap()
}

pub fn request(service_id: i32, hour: u32) -> NewBooking {
    NewBooking {
        service_offering_id: service_id,
        customer: CustomerInfo {
            name: "Meera Iyer".into(),
            email: "meera@example.com".into(),
            phone: "+919811111111".into(),
        },
        event: EventDetails {
            date: event_date(),
            start_time: NaiveTime::from_hms_opt(hour, 0, 0).unwrap(),
            location: "Bengaluru studio".into(),
            event_type: Some("headshots".into()),
            guest_count: Some(1),
            special_requests: None,
        },
    }
}

/// Browser callback signature over `"{order_id}|{payment_id}"`
pub fn sign_callback(order_id: &str, payment_id: &str) -> String {
    HmacSha256Verifier::new(KEY_SECRET).sign(format!("{}|{}", order_id, payment_id).as_bytes())
}

pub fn sign_webhook(body: &[u8]) -> String {
    HmacSha256Verifier::new(WEBHOOK_SECRET).sign(body)
}

pub fn payment_webhook(event: &str, order_id: &str, payment_id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "event": event,
        "payload": {
            "payment": {
                "entity": {
                    "id": payment_id,
                    "order_id": order_id,
                    "status": "captured",
                    "error_description": "card declined"
                }
            }
        }
    }))
    .unwrap()
}

pub fn refund_webhook(payment_id: &str, refund_id: &str) -> Vec<u8> {
    serde_json::to_vec(&json!({
        "event": "refund.processed",
        "payload": {
            "refund": { "entity": { "id": refund_id, "payment_id": payment_id } }
        }
    }))
    .unwrap()
}
