//! In-memory storage adapter.
//!
//! Implements the same repository traits as the PostgreSQL adapter on top
//! of lock-protected maps. Connection queries run against a copy of the
//! table taken under the read lock, so count and page always agree.
//!
//! Used for tests and for running the API without a database
//! (`--storage memory`). Text ordering is byte-wise, which may differ from
//! the collation of a PostgreSQL database.

mod table;

pub use table::{MemorySource, MemoryTable};

use std::sync::atomic::{AtomicI64, Ordering};

use async_trait::async_trait;
use chrono::Utc;
use tracing::debug;
use uuid::Uuid;

use waypoint_core::error::StorageResult;
use waypoint_core::models::{NewUser, NewVideo, User, Video};
use waypoint_core::ports::{
    Connection, Filter, PageWindow, Repositories, UserRepository, VideoRepository,
};
use waypoint_core::services::paginate;

// =============================================================================
// Users
// =============================================================================

/// In-memory implementation of UserRepository.
pub struct MemoryUserRepository {
    next_id: AtomicI64,
    table: MemoryTable<i64, User>,
}

impl MemoryUserRepository {
    pub fn new() -> Self {
        Self {
            next_id: AtomicI64::new(1),
            table: MemoryTable::new("users", User::COLUMNS),
        }
    }
}

impl Default for MemoryUserRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UserRepository for MemoryUserRepository {
    async fn create_user(&self, user: NewUser) -> StorageResult<User> {
        let user = User {
            id: self.next_id.fetch_add(1, Ordering::SeqCst),
            name: user.name,
            created_at: Utc::now(),
        };
        self.table.insert(user.id, user.clone()).await;
        debug!(id = user.id, "User created");
        Ok(user)
    }

    async fn get_user(&self, id: i64) -> StorageResult<Option<User>> {
        Ok(self.table.get(&id).await)
    }

    async fn get_users(&self, ids: &[i64]) -> StorageResult<Vec<Option<User>>> {
        Ok(self.table.get_many(ids).await)
    }

    async fn delete_user(&self, id: i64) -> StorageResult<bool> {
        Ok(self.table.remove(&id).await)
    }

    async fn list_users(
        &self,
        filter: &Filter,
        window: &PageWindow,
    ) -> StorageResult<Connection<User>> {
        let snapshot = self.table.snapshot().await;
        paginate(&snapshot, filter, window).await
    }
}

// =============================================================================
// Videos
// =============================================================================

/// In-memory implementation of VideoRepository.
pub struct MemoryVideoRepository {
    table: MemoryTable<Uuid, Video>,
}

impl MemoryVideoRepository {
    pub fn new() -> Self {
        Self {
            table: MemoryTable::new("videos", Video::COLUMNS),
        }
    }
}

impl Default for MemoryVideoRepository {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VideoRepository for MemoryVideoRepository {
    async fn create_video(&self, video: NewVideo) -> StorageResult<Video> {
        let video = Video {
            id: Uuid::new_v4(),
            name: video.name,
            created_at: Utc::now(),
        };
        self.table.insert(video.id, video.clone()).await;
        debug!(id = %video.id, "Video created");
        Ok(video)
    }

    async fn get_video(&self, id: Uuid) -> StorageResult<Option<Video>> {
        Ok(self.table.get(&id).await)
    }

    async fn get_videos(&self, ids: &[Uuid]) -> StorageResult<Vec<Option<Video>>> {
        Ok(self.table.get_many(ids).await)
    }

    async fn delete_video(&self, id: Uuid) -> StorageResult<bool> {
        Ok(self.table.remove(&id).await)
    }

    async fn list_videos(
        &self,
        filter: &Filter,
        window: &PageWindow,
    ) -> StorageResult<Connection<Video>> {
        let snapshot = self.table.snapshot().await;
        paginate(&snapshot, filter, window).await
    }
}

// =============================================================================
// Composite Repository
// =============================================================================

/// Aggregated in-memory repositories implementing the `Repositories` trait.
#[derive(Default)]
pub struct MemoryRepositories {
    users: MemoryUserRepository,
    videos: MemoryVideoRepository,
}

impl MemoryRepositories {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every row. Returns the number of users and videos removed.
    pub async fn purge(&self) -> (usize, usize) {
        (self.users.table.clear().await, self.videos.table.clear().await)
    }
}

impl Repositories for MemoryRepositories {
    fn users(&self) -> &dyn UserRepository {
        &self.users
    }

    fn videos(&self) -> &dyn VideoRepository {
        &self.videos
    }
}
