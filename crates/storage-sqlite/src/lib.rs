//! SQLite storage implementation for the security master.
//!
//! This crate provides all database-related functionality using Diesel ORM with SQLite.
//! It implements the repository traits defined in `secmaster-core` and contains:
//! - Connection pooling and the single-writer actor
//! - Diesel migrations
//! - The security repository
//! - Database-specific model types (with Diesel derives)
//!
//! # Architecture
//!
//! This crate is the only place in the workspace where Diesel dependencies exist.
//!
//! ```text
//!   core (domain, traits)
//!            │
//!            ▼
//!   storage-sqlite (this crate)
//!      │            │
//!   reads: pool   writes: WriteHandle
//!      │            │
//!      └─────┬──────┘
//!            ▼
//!        SQLite DB
//! ```
//!
//! Uniqueness (one active security per FIGI, one row per identifier triple)
//! is enforced by the schema; writers see conflicts as skipped inserts
//! rather than errors.

pub mod db;
pub mod errors;
pub mod schema;

pub mod securities;

// Re-export database utilities
pub use db::{
    create_pool, get_connection, init, run_migrations, spawn_writer, DbConnection, DbPool,
    WriteHandle,
};

// Re-export storage errors and conversion helpers
pub use errors::StorageError;

pub use securities::SecurityRepository;

// Re-export from secmaster-core for convenience
pub use secmaster_core::errors::{DatabaseError, Error, Result};
