//! Payment module: browser callback verification and gateway webhooks

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
