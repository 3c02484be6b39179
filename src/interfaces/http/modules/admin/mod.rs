//! Administrator module: booking management and dashboard statistics

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
