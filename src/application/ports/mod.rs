//! Application ports
//!
//! Outbound contracts the booking core consumes. Adapters live in
//! `infrastructure::gateway` and `infrastructure::crypto`.

pub mod outbound;

pub use outbound::{
    GatewayOrder, PaymentGateway, RefundReceipt, RefundStatus, SharedPaymentGateway,
    SharedSignatureVerifier, SignatureVerifier, WebhookEvent,
};
