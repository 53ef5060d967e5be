//! Video repository implementation for PostgreSQL.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::instrument;
use uuid::Uuid;

use waypoint_core::error::{StorageError, StorageResult};
use waypoint_core::models::{NewVideo, Video};
use waypoint_core::ports::{Connection, Filter, PageWindow, VideoRepository};
use waypoint_core::services::paginate;

use super::database::Database;
use super::helpers::TableSpec;
use super::snapshot::PgSnapshot;

pub(crate) static VIDEOS: TableSpec = TableSpec {
    name: "videos",
    columns: Video::COLUMNS,
};

/// PostgreSQL implementation of VideoRepository.
pub struct PgVideoRepository {
    pool: PgPool,
}

impl PgVideoRepository {
    pub fn new(db: &Database) -> Self {
        Self {
            pool: db.pool().clone(),
        }
    }
}

#[async_trait]
impl VideoRepository for PgVideoRepository {
    #[instrument(skip(self))]
    async fn create_video(&self, video: NewVideo) -> StorageResult<Video> {
        let row = sqlx::query_as::<_, VideoRow>(
            r#"
            INSERT INTO videos (id, name)
            VALUES ($1, $2)
            RETURNING id, name, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&video.name)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(row.into())
    }

    async fn get_video(&self, id: Uuid) -> StorageResult<Option<Video>> {
        let row = sqlx::query_as::<_, VideoRow>(
            r#"
            SELECT id, name, created_at
            FROM videos
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(row.map(Into::into))
    }

    async fn get_videos(&self, ids: &[Uuid]) -> StorageResult<Vec<Option<Video>>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }

        let rows = sqlx::query_as::<_, VideoRow>(
            r#"
            SELECT id, name, created_at
            FROM videos
            WHERE id = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| StorageError::QueryError(e.to_string()))?;

        let by_id: HashMap<Uuid, Video> = rows.into_iter().map(|r| (r.id, r.into())).collect();
        Ok(ids.iter().map(|id| by_id.get(id).cloned()).collect())
    }

    #[instrument(skip(self))]
    async fn delete_video(&self, id: Uuid) -> StorageResult<bool> {
        let result = sqlx::query("DELETE FROM videos WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| StorageError::QueryError(e.to_string()))?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip_all, fields(limit = window.limit))]
    async fn list_videos(
        &self,
        filter: &Filter,
        window: &PageWindow,
    ) -> StorageResult<Connection<Video>> {
        let snapshot = PgSnapshot::<VideoRow>::begin(&self.pool, &VIDEOS).await?;
        let connection = paginate(&snapshot, filter, window).await?;
        snapshot.finish().await?;
        Ok(connection)
    }
}

/// Database row representation for Video.
#[derive(sqlx::FromRow)]
pub(crate) struct VideoRow {
    id: Uuid,
    name: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl From<VideoRow> for Video {
    fn from(row: VideoRow) -> Self {
        Video {
            id: row.id,
            name: row.name,
            created_at: row.created_at,
        }
    }
}
