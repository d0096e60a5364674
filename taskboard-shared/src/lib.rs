//! # Taskboard Shared Library
//!
//! This crate contains the domain model, authorization rules, service layer
//! and storage adapters used by the Taskboard API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, boards, tasks and comments
//! - `auth`: Identity provider, tokens, passwords and the authorization engine
//! - `store`: Resource store port with PostgreSQL and in-memory adapters
//! - `services`: Board, task, comment and user operations
//! - `error`: The `ServiceError` taxonomy shared by services and the identity provider
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod error;
pub mod models;
pub mod services;
pub mod store;

/// Current version of the Taskboard shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
