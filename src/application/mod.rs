pub mod events;
pub mod ports;
pub mod services;

// Re-export key types for convenience
pub use events::{create_event_bus, Event, EventBus, EventSubscriber, SharedEventBus};
pub use ports::{PaymentGateway, SharedPaymentGateway, SharedSignatureVerifier, SignatureVerifier};
pub use services::{
    AvailabilityIndex, BookingLedger, HoldSweeper, LedgerSettings, NewBooking, PaymentOutcome,
    PaymentReconciler, ReconcilerSettings, RefundQueue, RefundWorker, ServiceCatalog,
    SweeperConfig, WebhookOutcome,
};
