//! Application configuration
//!
//! Loaded from `~/.config/studio-booking/config.toml` unless `STUDIO_CONFIG`
//! or `--config` points elsewhere. Every section has defaults, so a partial
//! file is valid.

use std::path::{Path, PathBuf};

use chrono::{FixedOffset, NaiveTime, Timelike};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const CONFIG_ENV_VAR: &str = "STUDIO_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// `~/.config/studio-booking/config.toml`, or `./config.toml` when there
/// is no config directory.
pub fn default_config_path() -> PathBuf {
    dirs_next::config_dir()
        .map(|dir| dir.join("studio-booking").join("config.toml"))
        .unwrap_or_else(|| PathBuf::from("config.toml"))
}

/// `STUDIO_CONFIG` if set, else [`default_config_path`].
pub fn resolve_config_path() -> PathBuf {
    std::env::var(CONFIG_ENV_VAR)
        .map(PathBuf::from)
        .unwrap_or_else(|_| default_config_path())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerSection,
    pub database: DatabaseSection,
    pub logging: LoggingSection,
    pub booking: BookingSection,
    pub gateway: GatewaySection,
    pub security: SecuritySection,
    pub admin: AdminSection,
    pub metrics: MetricsSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSection {
    pub api_host: String,
    pub api_port: u16,
    /// Seconds to wait for background tasks on shutdown
    pub shutdown_timeout: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        Self {
            api_host: "0.0.0.0".to_string(),
            api_port: 8080,
            shutdown_timeout: 30,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseSection {
    pub backend: StorageBackend,
    /// SQLite file, created on first start
    pub path: String,
}

impl Default for DatabaseSection {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            path: "./studio.db".to_string(),
        }
    }
}

impl DatabaseSection {
    pub fn connection_url(&self) -> String {
        match self.backend {
            StorageBackend::Sqlite => format!("sqlite://{}?mode=rwc", self.path),
            StorageBackend::Memory => "memory".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSection {
    pub level: String,
    /// `pretty` or `json`
    pub format: String,
}

impl Default for LoggingSection {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BookingSection {
    pub hold_ttl_secs: u64,
    pub sweep_interval_secs: u64,
    pub currency: String,
    /// Complete confirmed bookings once their event window has ended
    pub auto_complete: bool,
    /// `HH:MM`
    pub opening_time: String,
    /// `HH:MM`
    pub closing_time: String,
    pub slot_step_minutes: u32,
    /// Studio offset from UTC as `+HH:MM` or `-HH:MM`. Event dates and
    /// times are wall-clock times at the studio.
    pub utc_offset: String,
    /// How far ahead an event may be booked
    pub max_advance_days: u32,
    /// Insert the default catalog when the services table is empty
    pub seed_catalog: bool,
}

impl Default for BookingSection {
    fn default() -> Self {
        Self {
            hold_ttl_secs: 900,
            sweep_interval_secs: 60,
            currency: "INR".to_string(),
            auto_complete: true,
            opening_time: "08:00".to_string(),
            closing_time: "22:00".to_string(),
            slot_step_minutes: 30,
            utc_offset: "+00:00".to_string(),
            max_advance_days: 730,
            seed_catalog: true,
        }
    }
}

impl BookingSection {
    pub fn opening(&self) -> Result<NaiveTime, ConfigError> {
        parse_hhmm("booking.opening_time", &self.opening_time)
    }

    pub fn closing(&self) -> Result<NaiveTime, ConfigError> {
        parse_hhmm("booking.closing_time", &self.closing_time)
    }

    pub fn offset(&self) -> Result<FixedOffset, ConfigError> {
        let invalid = || {
            ConfigError::Invalid(format!(
                "booking.utc_offset must be +HH:MM or -HH:MM, got '{}'",
                self.utc_offset
            ))
        };
        let raw = self.utc_offset.trim();
        let (sign, rest) = if let Some(rest) = raw.strip_prefix('+') {
            (1, rest)
        } else if let Some(rest) = raw.strip_prefix('-') {
            (-1, rest)
        } else {
            return Err(invalid());
        };
        let hhmm = NaiveTime::parse_from_str(rest, "%H:%M").map_err(|_| invalid())?;
        let seconds = i32::try_from(hhmm.num_seconds_from_midnight()).map_err(|_| invalid())?;
        FixedOffset::east_opt(sign * seconds).ok_or_else(invalid)
    }
}

fn parse_hhmm(field: &str, raw: &str) -> Result<NaiveTime, ConfigError> {
    NaiveTime::parse_from_str(raw, "%H:%M")
        .map_err(|_| ConfigError::Invalid(format!("{} must be HH:MM, got '{}'", field, raw)))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GatewayProvider {
    Mock,
    Razorpay,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySection {
    pub provider: GatewayProvider,
    pub key_id: String,
    /// Signs browser callbacks
    pub key_secret: String,
    /// Signs server-to-server webhooks
    pub webhook_secret: String,
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for GatewaySection {
    fn default() -> Self {
        Self {
            provider: GatewayProvider::Mock,
            key_id: "rzp_test_key".to_string(),
            key_secret: "change-me-key-secret".to_string(),
            webhook_secret: "change-me-webhook-secret".to_string(),
            base_url: "https://api.razorpay.com/v1".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SecuritySection {
    pub jwt_secret: String,
    pub jwt_expiration_hours: i64,
}

impl Default for SecuritySection {
    fn default() -> Self {
        Self {
            jwt_secret: "change-me-in-production".to_string(),
            jwt_expiration_hours: 24,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AdminSection {
    pub username: String,
    /// bcrypt hash; takes precedence over `password`
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
    /// Plain password, hashed at startup
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for AdminSection {
    fn default() -> Self {
        Self {
            username: "admin".to_string(),
            password_hash: None,
            password: Some("admin".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsSection {
    pub enabled: bool,
}

impl Default for MetricsSection {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl AppConfig {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml(&raw)
    }

    pub fn from_toml(raw: &str) -> Result<Self, ConfigError> {
        let config: AppConfig = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let body = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| ConfigError::Write {
                path: parent.to_path_buf(),
                source,
            })?;
        }
        std::fs::write(path, body).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let booking = &self.booking;
        if booking.hold_ttl_secs == 0 {
            return Err(ConfigError::Invalid("booking.hold_ttl_secs must be positive".into()));
        }
        if booking.sweep_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "booking.sweep_interval_secs must be positive".into(),
            ));
        }
        if booking.slot_step_minutes == 0 {
            return Err(ConfigError::Invalid(
                "booking.slot_step_minutes must be positive".into(),
            ));
        }
        if booking.currency.trim().is_empty() {
            return Err(ConfigError::Invalid("booking.currency is empty".into()));
        }
        booking.offset()?;
        if booking.max_advance_days == 0 {
            return Err(ConfigError::Invalid(
                "booking.max_advance_days must be positive".into(),
            ));
        }
        if booking.opening()? >= booking.closing()? {
            return Err(ConfigError::Invalid(
                "booking.opening_time must be before closing_time".into(),
            ));
        }
        if self.gateway.timeout_secs == 0 {
            return Err(ConfigError::Invalid("gateway.timeout_secs must be positive".into()));
        }
        if self.gateway.key_secret.is_empty() || self.gateway.webhook_secret.is_empty() {
            return Err(ConfigError::Invalid("gateway secrets must not be empty".into()));
        }
        if self.security.jwt_secret.is_empty() {
            return Err(ConfigError::Invalid("security.jwt_secret is empty".into()));
        }
        if self.security.jwt_expiration_hours <= 0 {
            return Err(ConfigError::Invalid(
                "security.jwt_expiration_hours must be positive".into(),
            ));
        }
        if self.admin.username.trim().is_empty() {
            return Err(ConfigError::Invalid("admin.username is empty".into()));
        }
        if self.admin.password_hash.is_none() && self.admin.password.is_none() {
            return Err(ConfigError::Invalid(
                "admin needs password_hash or password".into(),
            ));
        }
        if !matches!(self.logging.format.to_lowercase().as_str(), "pretty" | "json") {
            return Err(ConfigError::Invalid(format!(
                "logging.format must be pretty or json, got '{}'",
                self.logging.format
            )));
        }
        Ok(())
    }
}
