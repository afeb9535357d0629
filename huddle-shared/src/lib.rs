//! # Huddle Shared Library
//!
//! Domain types, storage and business logic behind the Huddle API server.
//!
//! ## Module Organization
//!
//! - `models`: Users, groups, games, memberships and join requests
//! - `store`: The [`store::Store`] trait with PostgreSQL and in-memory backends
//! - `services`: Identity, group, game and membership operations
//! - `auth`: Tokens, password hashing and role checks
//! - `mail`: Outbound email for password reset
//! - `db`: Connection pool and migrations
//! - `seed`: Seed data import and teardown

pub mod auth;
pub mod db;
pub mod mail;
pub mod models;
pub mod seed;
pub mod services;
pub mod store;

/// Current version of the Huddle shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
