pub mod clock;
pub mod errors;
pub mod pagination;
pub mod retry;
pub mod shutdown;

pub use clock::*;
pub use errors::*;
pub use pagination::*;
pub use retry::*;
