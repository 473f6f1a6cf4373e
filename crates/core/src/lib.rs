//! Security Master Core - Domain entities, services, and traits.
//!
//! This crate contains the identifier resolution and enrichment logic.
//! It is database-agnostic and defines traits that are implemented
//! by the `storage-sqlite` crate; the oracle is reached through
//! [`secmaster_openfigi::MappingService`].

pub mod errors;
pub mod securities;

// Re-export common types from the securities module
pub use securities::*;

// Re-export error types
pub use errors::Error;
pub use errors::Result;
