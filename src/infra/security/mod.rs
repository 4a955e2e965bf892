//! Credential handling: signed access tokens and password hashes.

pub mod jwt;
pub mod password;

pub use jwt::{Claims, JwtKeys, TokenError};
pub use password::{PasswordError, PasswordHashing};
