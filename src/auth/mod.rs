//! Credential primitives: password hashing and signed access tokens.

pub mod password;
pub mod token;

pub use password::{hash_password, hash_password_blocking, verify_password};
pub use token::{Claims, TokenError, TokenIssuer};
