//! Payment gateway adapters

pub mod mock;
pub mod razorpay;

pub use mock::MockPaymentGateway;
pub use razorpay::{parse_razorpay_webhook, RazorpayConfig, RazorpayGateway};
