//! PostgreSQL storage adapter.
//!
//! This module implements the repository traits defined in `waypoint-core`
//! using PostgreSQL as the backing store.
//!
//! # Architecture
//!
//! - [`Database`] - Connection pool and migrations
//! - [`PgRepositories`] - Composite repository implementing `Repositories` trait
//! - Individual repos: [`PgUserRepository`], [`PgVideoRepository`]
//! - [`PgSnapshot`] - Repeatable-read range source backing connection queries
//!
//! # Usage
//!
//! ```ignore
//! let config = DatabaseConfig::for_api(&database_url);
//! let db = Database::connect(&config).await?;
//! db.migrate().await?;
//!
//! let repositories = PgRepositories::new(Arc::new(db));
//! ```

mod database;
mod helpers;
mod snapshot;
mod user_repo;
mod video_repo;

pub use database::{Database, DatabaseConfig, PurgeStats};
pub use helpers::TableSpec;
pub use snapshot::PgSnapshot;
pub use user_repo::PgUserRepository;
pub use video_repo::PgVideoRepository;

use std::sync::Arc;

use waypoint_core::ports::{Repositories, UserRepository, VideoRepository};

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated PostgreSQL repositories implementing the `Repositories` trait.
///
/// This provides a single entry point for all storage operations.
pub struct PgRepositories {
    db: Arc<Database>,
    users: PgUserRepository,
    videos: PgVideoRepository,
}

impl PgRepositories {
    /// Create a new repository aggregate from a database connection.
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            users: PgUserRepository::new(&db),
            videos: PgVideoRepository::new(&db),
            db,
        }
    }

    /// Underlying database handle.
    pub fn database(&self) -> &Database {
        &self.db
    }
}

impl Repositories for PgRepositories {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn videos(&self) -> &dyn VideoRepository {
        &self.videos
    }
}
