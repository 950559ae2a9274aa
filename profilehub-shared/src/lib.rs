//! # ProfileHub Shared Library
//!
//! This crate contains shared types, utilities, and business logic used across
//! the ProfileHub API server and the user importer.
//!
//! ## Module Organization
//!
//! - `models`: Database models and data structures
//! - `auth`: Password hashing, login tokens, reset tokens, auth middleware
//! - `recovery`: Security-question password recovery verifier
//! - `db`: Connection pool and migration runner

pub mod auth;
pub mod db;
pub mod models;
pub mod recovery;

/// Current version of the ProfileHub shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
