//! Credentials: password hashing and bearer tokens.

pub mod jwt;
pub mod password;

pub use jwt::{BearerToken, TokenClaims, TokenIssuer, TokenKind, TokenPair};
pub use password::{hash_password, verify_password};
