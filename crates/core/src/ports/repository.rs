//! Port traits for data repositories.
//!
//! These traits define the storage interface used by the domain layer.
//! Implementations live in the infrastructure layer (e.g., `waypoint-storage`).

use async_trait::async_trait;
use uuid::Uuid;

use crate::error::StorageResult;
use crate::models::{NewUser, NewVideo, User, Video};

use super::filter::Filter;
use super::pagination::{Connection, PageWindow};

// =============================================================================
// Repository Traits
// =============================================================================

/// Repository for users.
#[async_trait]
pub trait UserRepository: Send + Sync {
    /// Insert a user and return it with its assigned key.
    async fn create_user(&self, user: NewUser) -> StorageResult<User>;

    /// Get user by key.
    async fn get_user(&self, id: i64) -> StorageResult<Option<User>>;

    /// Get several users in one round trip.
    ///
    /// The result has the same length and order as `ids`.
    async fn get_users(&self, ids: &[i64]) -> StorageResult<Vec<Option<User>>>;

    /// Delete a user. Returns `false` if it did not exist.
    async fn delete_user(&self, id: i64) -> StorageResult<bool>;

    /// List users matching `filter` within a pagination window.
    ///
    /// Count and page are read from the same snapshot.
    async fn list_users(&self, filter: &Filter, window: &PageWindow)
        -> StorageResult<Connection<User>>;
}

/// Repository for videos.
#[async_trait]
pub trait VideoRepository: Send + Sync {
    /// Insert a video and return it with its assigned key.
    async fn create_video(&self, video: NewVideo) -> StorageResult<Video>;

    /// Get video by key.
    async fn get_video(&self, id: Uuid) -> StorageResult<Option<Video>>;

    /// Get several videos in one round trip.
    ///
    /// The result has the same length and order as `ids`.
    async fn get_videos(&self, ids: &[Uuid]) -> StorageResult<Vec<Option<Video>>>;

    /// Delete a video. Returns `false` if it did not exist.
    async fn delete_video(&self, id: Uuid) -> StorageResult<bool>;

    /// List videos matching `filter` within a pagination window.
    async fn list_videos(
        &self,
        filter: &Filter,
        window: &PageWindow,
    ) -> StorageResult<Connection<Video>>;
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Combined repository access for the API layer.
pub trait Repositories: Send + Sync {
    /// Access the user repository.
    fn users(&self) -> &dyn UserRepository;

    /// Access the video repository.
    fn videos(&self) -> &dyn VideoRepository;
}
