//! Node loaders for every entity type exposed through `node`/`nodes`.
//!
//! Adding an entity type to the node interface means adding a loader here
//! and registering it in [`build_node_registry`]; the resolver itself does
//! not change.

use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;

use waypoint_core::error::{RegistryError, StorageError, StorageResult};
use waypoint_core::models::{self, KeyKind, NodeType, RawKey};
use waypoint_core::ports::{NodeLoader, NodeRegistry, Repositories};

use crate::types::{Node, User, Video};

/// Loads users by integer key.
pub struct UserLoader {
    repos: Arc<dyn Repositories>,
}

impl UserLoader {
    pub fn new(repos: Arc<dyn Repositories>) -> Self {
        Self { repos }
    }
}

#[async_trait]
impl NodeLoader<Node> for UserLoader {
    fn type_tag(&self) -> &'static str {
        models::User::TYPE_TAG
    }

    fn key_kind(&self) -> KeyKind {
        KeyKind::Int
    }

    async fn load_one(&self, key: &RawKey) -> StorageResult<Option<Node>> {
        let user = self.repos.users().get_user(int_key(key)?).await?;
        Ok(user.map(|u| Node::User(User(u))))
    }

    async fn load_many(&self, keys: &[RawKey]) -> StorageResult<Vec<Option<Node>>> {
        let ids = keys.iter().map(int_key).collect::<StorageResult<Vec<_>>>()?;
        let users = self.repos.users().get_users(&ids).await?;
        Ok(users
            .into_iter()
            .map(|u| u.map(|u| Node::User(User(u))))
            .collect())
    }
}

/// Loads videos by UUID key.
pub struct VideoLoader {
    repos: Arc<dyn Repositories>,
}

impl VideoLoader {
    pub fn new(repos: Arc<dyn Repositories>) -> Self {
        Self { repos }
    }
}

#[async_trait]
impl NodeLoader<Node> for VideoLoader {
    fn type_tag(&self) -> &'static str {
        models::Video::TYPE_TAG
    }

    fn key_kind(&self) -> KeyKind {
        KeyKind::Uuid
    }

    async fn load_one(&self, key: &RawKey) -> StorageResult<Option<Node>> {
        let video = self.repos.videos().get_video(uuid_key(key)?).await?;
        Ok(video.map(|v| Node::Video(Video(v))))
    }

    async fn load_many(&self, keys: &[RawKey]) -> StorageResult<Vec<Option<Node>>> {
        let ids = keys.iter().map(uuid_key).collect::<StorageResult<Vec<_>>>()?;
        let videos = self.repos.videos().get_videos(&ids).await?;
        Ok(videos
            .into_iter()
            .map(|v| v.map(|v| Node::Video(Video(v))))
            .collect())
    }
}

// The resolver only hands out keys of the kind a loader declares.

fn int_key(key: &RawKey) -> StorageResult<i64> {
    key.as_int()
        .ok_or_else(|| StorageError::QueryError(format!("expected an int key, got {:?}", key)))
}

fn uuid_key(key: &RawKey) -> StorageResult<Uuid> {
    key.as_uuid()
        .ok_or_else(|| StorageError::QueryError(format!("expected a uuid key, got {:?}", key)))
}

/// Build the registry of every node type.
///
/// Called once at startup; an error here is a programming error and must
/// abort the process.
pub fn build_node_registry<R: Repositories + 'static>(
    repositories: Arc<R>,
) -> Result<NodeRegistry<Node>, RegistryError> {
    let repos: Arc<dyn Repositories> = repositories;
    Ok(NodeRegistry::builder()
        .with(Arc::new(UserLoader::new(Arc::clone(&repos))))?
        .with(Arc::new(VideoLoader::new(repos)))?
        .build())
}

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::models::{NewUser, NewVideo};
    use waypoint_storage::MemoryRepositories;

    #[tokio::test]
    async fn test_registry_serves_both_types() {
        let repos = Arc::new(MemoryRepositories::new());
        let registry = build_node_registry(Arc::clone(&repos)).unwrap();
        assert_eq!(registry.type_tags(), vec!["User", "Video"]);

        let user = repos
            .users()
            .create_user(NewUser { name: "U1".into() })
            .await
            .unwrap();
        let video = repos
            .videos()
            .create_video(NewVideo { name: "V1".into() })
            .await
            .unwrap();

        let loader = registry.lookup("User").unwrap();
        let loaded = loader
            .load_many(&[RawKey::Int(user.id), RawKey::Int(99)])
            .await
            .unwrap();
        assert!(matches!(&loaded[0], Some(Node::User(u)) if u.0.name == "U1"));
        assert!(loaded[1].is_none());

        let loader = registry.lookup("Video").unwrap();
        let loaded = loader.load_one(&RawKey::Uuid(video.id)).await.unwrap();
        assert!(matches!(loaded, Some(Node::Video(v)) if v.0.id == video.id));
    }

    // Test critique: un type enregistré deux fois fait échouer le démarrage
    #[test]
    fn test_duplicate_loader_is_fatal() {
        let repos: Arc<dyn Repositories> = Arc::new(MemoryRepositories::new());
        let err = NodeRegistry::<Node>::builder()
            .with(Arc::new(UserLoader::new(Arc::clone(&repos))))
            .and_then(|b| b.with(Arc::new(UserLoader::new(repos))))
            .err();
        assert_eq!(err, Some(RegistryError::DuplicateRegistration("User".into())));
    }
}
