//! SQLite persistence for the housing listing engine.
//!
//! Responsibilities:
//! - Own the listing schema and pooled SQLite connections.
//! - Execute predicates and assignments assembled by `housing-core`.
//! - Assemble the lot → room → living place graph with batched reads.
//!
//! Boundaries:
//! - Do not encode listing rules (live in `housing-core`).
//! - Callers resolve ownership; the repository receives it as a flag.
//!
//! Invariants:
//! - One pooled connection and one transaction per repository call.
//! - Caller values are always bound as parameters.

pub mod aggregate;
mod error;
mod pool;
mod repository;
mod rows;
mod schema;
pub mod test_support;

pub use error::RepositoryError;
pub use pool::{ConnectionPool, PoolConfig, PooledConnection};
pub use repository::{LotRepository, PublishRequest, RepositoryConfig, RoomUpdate};
pub use schema::{SCHEMA_VERSION, initialise_schema};
