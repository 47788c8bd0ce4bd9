//! Authentication primitives.
//!
//! - [`password`] -- Argon2id password hashing and verification.
//! - [`jwt`] -- JWT access-token generation and validation, plus hashing of
//!   opaque MFA challenge tokens.

pub mod jwt;
pub mod password;
