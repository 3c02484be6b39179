//! Reusable server runtime.
//!
//! [`ServerHandle`] owns the full lifecycle: storage, calendar restore,
//! background workers, the REST API and graceful shutdown. The CLI and the
//! default binary both start the service through it.

use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use sea_orm::DatabaseConnection;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

use crate::application::{
    create_event_bus, AvailabilityIndex, BookingLedger, HoldSweeper, LedgerSettings,
    PaymentGateway, PaymentReconciler, ReconcilerSettings, RefundQueue, RefundWorker,
    ServiceCatalog, SharedEventBus, SharedPaymentGateway, SweeperConfig,
};
use crate::config::{AppConfig, GatewayProvider, StorageBackend};
use crate::domain::RepositoryProvider;
use crate::infrastructure::crypto::jwt::JwtConfig;
use crate::infrastructure::crypto::password::hash_password;
use crate::infrastructure::crypto::signature::HmacSha256Verifier;
use crate::infrastructure::{
    init_database, run_migrations, DatabaseConfig, InMemoryRepositoryProvider,
    MockPaymentGateway, RazorpayConfig, RazorpayGateway, SeaOrmRepositoryProvider,
};
use crate::interfaces::http::middleware::AuthState;
use crate::interfaces::http::{
    create_api_router, AdminCredentials, AppState, BusinessHours, HealthState,
};
use crate::shared::shutdown::{ShutdownCoordinator, ShutdownSignal};
use crate::shared::{system_clock, SharedClock};

type BoxError = Box<dyn std::error::Error>;

// ── Options ────────────────────────────────────────────────────────

pub struct ServerOptions {
    pub config: AppConfig,
    /// Run database migrations on startup (default: true)
    pub auto_migrate: bool,
}

impl Default for ServerOptions {
    fn default() -> Self {
        Self {
            config: AppConfig::default(),
            auto_migrate: true,
        }
    }
}

// ── Wiring ─────────────────────────────────────────────────────────

/// Every service of the booking engine, wired together but not running.
pub struct AppComponents {
    pub repos: Arc<dyn RepositoryProvider>,
    pub catalog: Arc<ServiceCatalog>,
    pub availability: Arc<AvailabilityIndex>,
    pub ledger: Arc<BookingLedger>,
    pub reconciler: Arc<PaymentReconciler>,
    pub events: SharedEventBus,
    pub refunds: RefundQueue,
    pub refund_worker: RefundWorker,
    pub state: AppState,
}

impl AppComponents {
    pub fn assemble(
        config: &AppConfig,
        repos: Arc<dyn RepositoryProvider>,
        gateway: SharedPaymentGateway,
        clock: SharedClock,
        db: Option<DatabaseConnection>,
    ) -> Result<Self, BoxError> {
        let booking_cfg = &config.booking;
        let business_hours = BusinessHours {
            opening: booking_cfg.opening()?,
            closing: booking_cfg.closing()?,
            step_minutes: booking_cfg.slot_step_minutes,
        };

        let events = create_event_bus();
        let (refunds, refund_rx) = RefundQueue::new();
        let catalog = Arc::new(ServiceCatalog::new(repos.clone(), clock.clone()));
        let utc_offset = booking_cfg.offset()?;
        let availability = Arc::new(
            AvailabilityIndex::new(repos.clone(), clock.clone()).with_utc_offset(utc_offset),
        );
        let ledger = Arc::new(BookingLedger::new(
            repos.clone(),
            catalog.clone(),
            availability.clone(),
            events.clone(),
            refunds.clone(),
            clock,
            LedgerSettings {
                hold_ttl: chrono::Duration::seconds(booking_cfg.hold_ttl_secs as i64),
                currency: booking_cfg.currency.clone(),
                utc_offset,
                max_advance: chrono::Duration::days(i64::from(booking_cfg.max_advance_days)),
            },
        ));

        let reconciler = Arc::new(PaymentReconciler::new(
            ledger.clone(),
            repos.clone(),
            gateway,
            Arc::new(HmacSha256Verifier::new(&config.gateway.key_secret)),
            Arc::new(HmacSha256Verifier::new(&config.gateway.webhook_secret)),
            ReconcilerSettings {
                gateway_timeout: Duration::from_secs(config.gateway.timeout_secs),
                ..Default::default()
            },
        ));
        let refund_worker = RefundWorker::new(reconciler.clone(), refund_rx);

        let state = AppState {
            ledger: ledger.clone(),
            reconciler: reconciler.clone(),
            auth: AuthState {
                jwt_config: JwtConfig::new(
                    config.security.jwt_secret.clone(),
                    config.security.jwt_expiration_hours,
                ),
            },
            admin: Arc::new(admin_credentials(config)?),
            business_hours,
            gateway_key_id: Some(config.gateway.key_id.clone()),
            health: HealthState {
                db,
                started_at: Arc::new(Instant::now()),
            },
        };

        Ok(Self {
            repos,
            catalog,
            availability,
            ledger,
            reconciler,
            events,
            refunds,
            refund_worker,
            state,
        })
    }
}

fn admin_credentials(config: &AppConfig) -> Result<AdminCredentials, BoxError> {
    let password_hash = match (&config.admin.password_hash, &config.admin.password) {
        (Some(hash), _) => hash.clone(),
        (None, Some(plain)) => {
            warn!("Admin password is configured in plain text; prefer admin.password_hash");
            hash_password(plain)?
        }
        (None, None) => return Err("admin credentials are not configured".into()),
    };
    Ok(AdminCredentials {
        username: config.admin.username.clone(),
        password_hash,
    })
}

fn build_gateway(config: &AppConfig) -> Result<SharedPaymentGateway, BoxError> {
    let gateway: SharedPaymentGateway = match config.gateway.provider {
        GatewayProvider::Mock => {
            warn!("Using the mock payment gateway; no real money moves");
            Arc::new(MockPaymentGateway::new())
        }
        GatewayProvider::Razorpay => Arc::new(RazorpayGateway::new(RazorpayConfig {
            key_id: config.gateway.key_id.clone(),
            key_secret: config.gateway.key_secret.clone(),
            base_url: config.gateway.base_url.clone(),
            timeout: Duration::from_secs(config.gateway.timeout_secs),
        })?),
    };
    info!(gateway = gateway.name(), "Payment gateway ready");
    Ok(gateway)
}

/// The global recorder can only be installed once per process.
fn prometheus_handle() -> Option<PrometheusHandle> {
    static PROM_HANDLE: OnceLock<Option<PrometheusHandle>> = OnceLock::new();
    PROM_HANDLE
        .get_or_init(|| match PrometheusBuilder::new().install_recorder() {
            Ok(handle) => {
                info!("Prometheus metrics recorder installed");
                Some(handle)
            }
            Err(e) => {
                warn!(error = %e, "Metrics recorder unavailable");
                None
            }
        })
        .clone()
}

// ── ServerHandle ───────────────────────────────────────────────────

/// Handle to a running booking service.
///
/// ```rust,no_run
/// use studio_booking::server::{ServerHandle, ServerOptions};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let handle = ServerHandle::start(ServerOptions::default()).await?;
///     handle.shutdown().await;
///     Ok(())
/// }
/// ```
pub struct ServerHandle {
    pub ledger: Arc<BookingLedger>,
    pub reconciler: Arc<PaymentReconciler>,
    pub events: SharedEventBus,
    pub config: AppConfig,
    pub api_port: u16,

    db: Option<DatabaseConnection>,
    shutdown: ShutdownCoordinator,
    api_task: JoinHandle<()>,
    sweeper_task: JoinHandle<()>,
    refund_task: JoinHandle<()>,
}

impl ServerHandle {
    /// Start the service:
    /// 1. install the metrics recorder
    /// 2. open storage (SQLite with migrations, or memory)
    /// 3. seed the catalog and restore the calendar
    /// 4. re-queue refunds left pending by a previous run
    /// 5. start the refund worker, the hold sweeper and the REST API
    pub async fn start(opts: ServerOptions) -> Result<Self, BoxError> {
        let app_cfg = opts.config;
        app_cfg.validate()?;

        info!("Starting studio booking service...");

        let metrics = if app_cfg.metrics.enabled {
            prometheus_handle()
        } else {
            None
        };

        let clock = system_clock();
        let (repos, db): (Arc<dyn RepositoryProvider>, Option<DatabaseConnection>) =
            match app_cfg.database.backend {
                StorageBackend::Memory => {
                    warn!("In-memory storage: bookings are lost on restart");
                    (Arc::new(InMemoryRepositoryProvider::new(clock.clone())), None)
                }
                StorageBackend::Sqlite => {
                    let db = init_database(&DatabaseConfig::sqlite(&app_cfg.database.path)).await?;
                    if opts.auto_migrate {
                        run_migrations(&db).await?;
                    }
                    (
                        Arc::new(SeaOrmRepositoryProvider::new(db.clone(), clock.clone())),
                        Some(db),
                    )
                }
            };

        let gateway = build_gateway(&app_cfg)?;
        let components = AppComponents::assemble(&app_cfg, repos, gateway, clock, db.clone())?;

        if app_cfg.booking.seed_catalog {
            let seeded = components.catalog.seed_defaults().await?;
            if seeded > 0 {
                info!(seeded, "Default service catalog inserted");
            }
        }
        components.availability.restore().await?;

        let owed = components.ledger.pending_refunds().await?;
        if !owed.is_empty() {
            info!(count = owed.len(), "Re-queueing refunds from a previous run");
        }
        for request in owed {
            components.refunds.enqueue(request);
        }

        // ── Background tasks ───────────────────────────────────
        let shutdown = ShutdownCoordinator::new(app_cfg.server.shutdown_timeout);
        let shutdown_signal = shutdown.signal();

        let refund_task = components.refund_worker.start(shutdown_signal.clone());
        let sweeper = Arc::new(HoldSweeper::new(components.ledger.clone()).with_config(
            SweeperConfig {
                interval: Duration::from_secs(app_cfg.booking.sweep_interval_secs),
                auto_complete: app_cfg.booking.auto_complete,
            },
        ));
        let sweeper_task = sweeper.start(shutdown_signal.clone());

        // ── REST API server ────────────────────────────────────
        let api_router = create_api_router(components.state, metrics);
        let api_port = app_cfg.server.api_port;
        let api_addr = format!("{}:{}", app_cfg.server.api_host, api_port);
        let listener = tokio::net::TcpListener::bind(&api_addr).await?;
        info!("REST API server listening on http://{}", api_addr);
        info!("Swagger UI available at http://{}/docs/", api_addr);

        let api_shutdown = shutdown_signal.clone();
        let api_server = axum::serve(listener, api_router).with_graceful_shutdown(async move {
            api_shutdown.wait().await;
            info!("REST API server received shutdown signal");
        });
        let api_task = tokio::spawn(async move {
            if let Err(e) = api_server.await {
                error!("REST API server error: {}", e);
            }
        });

        Ok(Self {
            ledger: components.ledger,
            reconciler: components.reconciler,
            events: components.events,
            config: app_cfg,
            api_port,
            db,
            shutdown,
            api_task,
            sweeper_task,
            refund_task,
        })
    }

    pub fn shutdown_signal(&self) -> ShutdownSignal {
        self.shutdown.signal()
    }

    /// Install OS signal listeners (SIGTERM, SIGINT) that trigger shutdown.
    pub fn install_signal_handler(&self) {
        self.shutdown.start_signal_listener();
    }

    pub fn trigger_shutdown(&self) {
        self.shutdown.signal().trigger();
    }

    /// Wait for every task to stop after shutdown has been triggered.
    pub async fn wait(self) {
        info!("Waiting for server tasks to complete...");

        match self.api_task.await {
            Ok(()) => info!("REST API server stopped"),
            Err(e) => error!("REST API server task panicked: {}", e),
        }

        let sweeper_task = self.sweeper_task;
        let refund_task = self.refund_task;
        let finished = self
            .shutdown
            .finish(async move {
                if let Err(e) = sweeper_task.await {
                    error!("Hold sweeper task panicked: {}", e);
                }
                if let Err(e) = refund_task.await {
                    error!("Refund worker task panicked: {}", e);
                }
            })
            .await;
        if !finished {
            warn!("Background tasks did not stop in time");
        }

        if let Some(db) = self.db {
            if let Err(e) = db.close().await {
                warn!("Error closing database connection: {}", e);
            } else {
                info!("Database connection closed");
            }
        }

        info!("Studio booking service shutdown complete");
    }

    pub async fn shutdown(self) {
        info!("Shutting down studio booking service...");
        self.trigger_shutdown();
        self.wait().await;
    }

    pub fn is_running(&self) -> bool {
        !self.api_task.is_finished()
    }
}

/// Initialize tracing from the logging section. `RUST_LOG` wins over the
/// configured level. Call once at process startup.
pub fn init_tracing(config: &AppConfig) {
    use tracing_subscriber::layer::SubscriberExt;
    use tracing_subscriber::util::SubscriberInitExt;

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));

    match config.logging.format.to_lowercase().as_str() {
        "json" => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer().json())
                .init();
        }
        _ => {
            tracing_subscriber::registry()
                .with(env_filter)
                .with(tracing_subscriber::fmt::layer())
                .init();
        }
    }
}
