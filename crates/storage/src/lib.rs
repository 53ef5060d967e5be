//! Storage layer for waypoint.
//!
//! This crate provides implementations of the repository traits defined in
//! `waypoint-core`: a PostgreSQL adapter handling connection pooling,
//! migrations and snapshot-consistent connection queries, and an in-memory
//! adapter with the same semantics.
//!
//! # Architecture
//!
//! The storage layer follows the repository pattern:
//!
//! - [`postgres::Database`] - Connection pool management
//! - [`postgres::PgRepositories`] - Composite repository for all entity types
//! - [`memory::MemoryRepositories`] - Composite in-memory repository
//!
//! Connection queries go through [`waypoint_core::services::paginate`] with
//! a range source bound to a read snapshot ([`postgres::PgSnapshot`] or
//! [`memory::MemorySource`]).
//!
//! # Usage
//!
//! ```ignore
//! use waypoint_storage::{Database, DatabaseConfig, PgRepositories};
//!
//! // Connect to the database
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//!
//! // Run migrations
//! db.migrate().await?;
//!
//! // Create repositories
//! let repositories = Arc::new(PgRepositories::new(Arc::new(db)));
//! ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryRepositories;
pub use postgres::{Database, DatabaseConfig, PgRepositories, PurgeStats};
