//! Credential handling
//!
//! Only password hashing lives here; token issuance belongs to the auth
//! service that consumes the user repository.

pub mod password;

pub use password::{generate_password, hash_password, verify_password};
