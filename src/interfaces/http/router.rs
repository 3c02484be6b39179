//! API Router with Swagger UI

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};
use utoipa_swagger_ui::SwaggerUi;

use super::common::ApiResponse;
use super::middleware::admin_auth_middleware;
use super::modules::metrics::{http_metrics_middleware, prometheus_metrics, MetricsState};
use super::modules::request_id::request_id_middleware;
use super::modules::{admin, auth, availability, bookings, health, payments, services};
use super::state::AppState;

/// Security scheme modifier for OpenAPI
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Administrator JWT from /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

/// OpenAPI documentation
#[derive(OpenApi)]
#[openapi(
    paths(
        // Health
        health::health_check,
        // Auth
        auth::login,
        // Services
        services::list_services,
        services::get_service,
        services::create_service,
        services::update_service,
        // Availability
        availability::get_availability,
        // Bookings
        bookings::create_booking,
        bookings::get_booking,
        bookings::request_payment,
        // Payments
        payments::verify_payment,
        payments::payment_webhook,
        // Admin
        admin::list_bookings,
        admin::get_stats,
        admin::cancel_booking,
        admin::complete_booking,
        admin::update_booking_status,
    ),
    components(
        schemas(
            ApiResponse<String>,
            services::ServiceResponse,
            services::ServiceRequest,
            availability::AvailabilityResponse,
            availability::BusyWindow,
            bookings::CreateBookingRequest,
            bookings::CustomerDto,
            bookings::BookingResponse,
            bookings::SlotConflictDetails,
            bookings::PaymentIntentResponse,
            payments::VerifyPaymentRequest,
            payments::VerifyPaymentResponse,
            payments::WebhookAck,
            admin::UpdateStatusRequest,
            admin::StatsResponse,
            auth::LoginRequest,
            auth::LoginResponse,
            health::HealthResponse,
            health::ComponentHealth,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Health", description = "Liveness and storage status"),
        (name = "Authentication", description = "Administrator login"),
        (name = "Services", description = "Service catalog"),
        (name = "Availability", description = "Calendar availability"),
        (name = "Bookings", description = "Booking lifecycle"),
        (name = "Payments", description = "Payment verification and gateway webhooks"),
        (name = "Admin", description = "Booking administration")
    ),
    info(
        title = "Studio Booking API",
        version = "0.1.0",
        description = "Booking and payment reconciliation for a photography studio"
    )
)]
pub struct ApiDoc;

/// Build the full HTTP router.
///
/// `metrics` is the installed Prometheus recorder, if any.
pub fn create_api_router(state: AppState, metrics: Option<PrometheusHandle>) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let public_routes = Router::new()
        .route("/services", get(services::list_services))
        .route("/services/{id}", get(services::get_service))
        .route("/availability", get(availability::get_availability))
        .route("/bookings", post(bookings::create_booking))
        .route("/bookings/{id}", get(bookings::get_booking))
        .route("/bookings/{id}/payment", post(bookings::request_payment))
        .route("/payments/verify", post(payments::verify_payment))
        .route("/payments/webhook", post(payments::payment_webhook))
        .route("/auth/login", post(auth::login));

    let admin_routes = Router::new()
        .route("/bookings", get(admin::list_bookings))
        .route("/stats", get(admin::get_stats))
        .route("/bookings/{id}/cancel", post(admin::cancel_booking))
        .route("/bookings/{id}/complete", post(admin::complete_booking))
        .route("/bookings/{id}/status", post(admin::update_booking_status))
        .route("/services", post(services::create_service))
        .route("/services/{id}", put(services::update_service))
        .layer(middleware::from_fn_with_state(
            state.auth.clone(),
            admin_auth_middleware,
        ));

    let metrics_routes = Router::new()
        .route("/metrics", get(prometheus_metrics))
        .with_state(MetricsState { handle: metrics });

    let swagger_routes = SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi());

    Router::new()
        .route("/health", get(health::health_check))
        .nest("/api/v1", public_routes)
        .nest("/api/v1/admin", admin_routes)
        .with_state(state)
        .merge(metrics_routes)
        .merge(swagger_routes)
        .layer(middleware::from_fn(http_metrics_middleware))
        .layer(middleware::from_fn(request_id_middleware))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}
