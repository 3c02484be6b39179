//! Studio booking service: CLI server
//!
//! ```sh
//! # Default config (~/.config/studio-booking/config.toml)
//! studio-booking
//!
//! # Custom config path
//! studio-booking --config /etc/studio-booking/config.toml
//!
//! # Throwaway instance with the mock gateway
//! studio-booking --memory --api-port 8081
//!
//! # Validate config without starting
//! studio-booking --check
//! ```

use std::path::PathBuf;

use clap::Parser;
use tracing::{error, info};

use studio_booking::config::{AppConfig, StorageBackend};
use studio_booking::server::{init_tracing, ServerHandle, ServerOptions};

/// Booking and payment service for a photography studio.
#[derive(Parser, Debug)]
#[command(
    name = "studio-booking",
    version,
    about = "Booking and payment reconciliation service",
    long_about = "REST API for studio bookings: catalog, availability, \
                  slot holds and payment-gateway reconciliation.\n\n\
                  Default config: ~/.config/studio-booking/config.toml"
)]
struct Cli {
    /// Path to the configuration file (TOML).
    #[arg(short, long, env = "STUDIO_CONFIG")]
    config: Option<PathBuf>,

    /// Override the REST API listen port.
    #[arg(long)]
    api_port: Option<u16>,

    /// Override the log level (trace, debug, info, warn, error).
    #[arg(short, long)]
    log_level: Option<String>,

    /// Override the SQLite database file.
    #[arg(long, conflicts_with = "memory")]
    database: Option<String>,

    /// Keep everything in memory.
    #[arg(long)]
    memory: bool,

    /// Validate the configuration file and exit without starting the server.
    #[arg(long)]
    check: bool,

    /// Skip database migrations on startup.
    #[arg(long)]
    no_migrate: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config_path = cli.config.unwrap_or_else(studio_booking::default_config_path);

    let loaded = AppConfig::load(&config_path);
    if cli.check {
        return match loaded {
            Ok(config) => {
                println!("Configuration is valid");
                println!("   Config file : {}", config_path.display());
                println!("   API address : {}:{}", config.server.api_host, config.server.api_port);
                println!("   Database    : {}", config.database.connection_url());
                println!("   Gateway     : {:?}", config.gateway.provider);
                println!("   Hold TTL    : {}s", config.booking.hold_ttl_secs);
                println!("   Log level   : {}", config.logging.level);
                Ok(())
            }
            Err(e) => {
                eprintln!("Configuration error in {}: {}", config_path.display(), e);
                Err(e.into())
            }
        };
    }

    let (mut config, load_error) = match loaded {
        Ok(cfg) => (cfg, None),
        Err(e) => (AppConfig::default(), Some(e)),
    };

    // ── Apply CLI overrides ───────────────────────────────────
    let mut overrides = Vec::new();
    if let Some(port) = cli.api_port {
        config.server.api_port = port;
        overrides.push(format!("api_port = {}", port));
    }
    if let Some(level) = cli.log_level {
        overrides.push(format!("log_level = {}", level));
        config.logging.level = level;
    }
    if let Some(path) = cli.database {
        overrides.push(format!("database = {}", path));
        config.database.backend = StorageBackend::Sqlite;
        config.database.path = path;
    }
    if cli.memory {
        config.database.backend = StorageBackend::Memory;
        overrides.push("in-memory storage".to_string());
    }

    init_tracing(&config);
    match load_error {
        None => info!("Configuration loaded from {}", config_path.display()),
        Some(e) => {
            error!("Failed to load config from {}: {}", config_path.display(), e);
            error!("Using default configuration.");
        }
    }
    for applied in &overrides {
        info!("CLI override: {}", applied);
    }

    let handle = ServerHandle::start(ServerOptions {
        config,
        auto_migrate: !cli.no_migrate,
    })
    .await?;

    handle.install_signal_handler();
    info!("Press Ctrl+C to shutdown gracefully.");

    handle.shutdown_signal().wait().await;
    handle.wait().await;

    Ok(())
}
