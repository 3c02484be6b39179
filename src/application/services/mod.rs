//! Application services

mod availability;
mod catalog;
mod ledger;
mod reconciler;
mod refunds;
mod sweeper;

pub use availability::AvailabilityIndex;
pub use catalog::ServiceCatalog;
pub use ledger::{
    BookingLedger, LedgerSettings, NewBooking, PaymentOutcome, PaymentPreparation,
    MANUAL_PAYMENT_PREFIX,
};
pub use reconciler::{PaymentReconciler, ReconcilerSettings, WebhookOutcome};
pub use refunds::{RefundQueue, RefundRequest, RefundWorker};
pub use sweeper::{HoldSweeper, SweepReport, SweeperConfig};
