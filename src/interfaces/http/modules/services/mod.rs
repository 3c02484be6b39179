//! Service catalog module: public listing, admin create/update

pub mod dto;
pub mod handlers;

pub use dto::*;
pub use handlers::*;
