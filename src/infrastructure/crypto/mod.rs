pub mod jwt;
pub mod password;
pub mod signature;

pub use jwt::{create_token, verify_token, JwtConfig, TokenClaims};
pub use password::{hash_password, verify_password};
pub use signature::HmacSha256Verifier;
