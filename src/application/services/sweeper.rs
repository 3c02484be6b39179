//! Hold sweeper
//!
//! Background task that enforces the hold TTL proactively. Each pass:
//! releases expired holds from the calendar and expires their bookings,
//! expires any other pending booking past its deadline, and optionally
//! completes confirmed bookings whose event has ended.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use super::ledger::BookingLedger;
use crate::domain::DomainResult;
use crate::shared::shutdown::ShutdownSignal;

#[derive(Debug, Clone)]
pub struct SweeperConfig {
    pub interval: Duration,
    pub auto_complete: bool,
}

impl Default for SweeperConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(60),
            auto_complete: true,
        }
    }
}

/// Counts from one sweep pass
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub holds_released: usize,
    pub bookings_expired: usize,
    pub bookings_completed: usize,
}

pub struct HoldSweeper {
    ledger: Arc<BookingLedger>,
    config: SweeperConfig,
    running: Arc<RwLock<bool>>,
}

impl HoldSweeper {
    pub fn new(ledger: Arc<BookingLedger>) -> Self {
        Self {
            ledger,
            config: SweeperConfig::default(),
            running: Arc::new(RwLock::new(false)),
        }
    }

    pub fn with_config(mut self, config: SweeperConfig) -> Self {
        self.config = config;
        self
    }

    pub fn start(self: Arc<Self>, shutdown: ShutdownSignal) -> JoinHandle<()> {
        tokio::spawn(async move {
            *self.running.write().await = true;
            info!(
                interval_secs = self.config.interval.as_secs(),
                auto_complete = self.config.auto_complete,
                "Hold sweeper started"
            );

            let mut interval = tokio::time::interval(self.config.interval);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        if let Err(e) = self.sweep().await {
                            warn!(error = %e, "Sweep failed");
                        }
                    }
                    _ = shutdown.wait() => {
                        info!("Hold sweeper shutting down");
                        break;
                    }
                }
            }

            *self.running.write().await = false;
            info!("Hold sweeper stopped");
        })
    }

    pub async fn is_running(&self) -> bool {
        *self.running.read().await
    }

    /// Run one pass now.
    pub async fn sweep(&self) -> DomainResult<SweepReport> {
        let mut report = SweepReport::default();

        let released = self.ledger.availability().sweep_expired().await;
        report.holds_released = released.len();
        for reservation in released {
            match self.ledger.expire(reservation.booking_id).await {
                Ok(true) => report.bookings_expired += 1,
                Ok(false) => {}
                Err(e) => warn!(
                    booking_id = %reservation.booking_id,
                    error = %e,
                    "Failed to expire booking for released hold"
                ),
            }
        }

        report.bookings_expired += self.ledger.expire_overdue().await?;
        if self.config.auto_complete {
            report.bookings_completed = self.ledger.complete_past().await?;
        }
        self.ledger.prune_locks();

        if report != SweepReport::default() {
            info!(
                holds_released = report.holds_released,
                bookings_expired = report.bookings_expired,
                bookings_completed = report.bookings_completed,
                "Sweep finished"
            );
        } else {
            debug!("Sweep found nothing to do");
        }
        Ok(report)
    }
}
