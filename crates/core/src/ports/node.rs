//! Port trait for per-type node loaders and the registry dispatching to them.
//!
//! This is the main extensibility point of the node interface. Each entity
//! type reachable by global ID implements [`NodeLoader`] and is registered
//! once at startup; the resolver then dispatches on the ID's type tag.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use tracing::info;

use crate::error::{DecodeError, RegistryError, StorageResult};
use crate::ids::{is_valid_type_tag, GlobalId};
use crate::models::{KeyKind, RawKey};

/// Capability bundle for loading entities of one type by raw key.
///
/// `N` is the polymorphic node representation produced for every type.
#[async_trait]
pub trait NodeLoader<N: Send>: Send + Sync {
    /// Type tag this loader serves (e.g., "User").
    fn type_tag(&self) -> &'static str;

    /// Kind of raw key accepted by [`load_one`](NodeLoader::load_one).
    fn key_kind(&self) -> KeyKind;

    /// Load one entity. Returns `None` if it does not exist.
    async fn load_one(&self, key: &RawKey) -> StorageResult<Option<N>>;

    /// Load several entities.
    ///
    /// The result has the same length and order as `keys`, with `None`
    /// wherever no entity exists. Override this to batch the lookup.
    async fn load_many(&self, keys: &[RawKey]) -> StorageResult<Vec<Option<N>>> {
        let mut nodes = Vec::with_capacity(keys.len());
        for key in keys {
            nodes.push(self.load_one(key).await?);
        }
        Ok(nodes)
    }
}

/// Read-only registry of node loaders, keyed by type tag.
///
/// Built once at startup through [`NodeRegistryBuilder`] and shared
/// behind an `Arc` afterwards.
pub struct NodeRegistry<N: Send> {
    loaders: HashMap<&'static str, Arc<dyn NodeLoader<N>>>,
}

impl<N: Send> NodeRegistry<N> {
    pub fn builder() -> NodeRegistryBuilder<N> {
        NodeRegistryBuilder::new()
    }

    /// Get the loader for a type tag.
    pub fn lookup(&self, type_tag: &str) -> Result<&Arc<dyn NodeLoader<N>>, RegistryError> {
        self.loaders
            .get(type_tag)
            .ok_or_else(|| RegistryError::NotFound(type_tag.to_string()))
    }

    /// Check if a type tag has a registered loader.
    pub fn contains(&self, type_tag: &str) -> bool {
        self.loaders.contains_key(type_tag)
    }

    /// All registered type tags, sorted.
    pub fn type_tags(&self) -> Vec<&'static str> {
        let mut tags: Vec<_> = self.loaders.keys().copied().collect();
        tags.sort_unstable();
        tags
    }

    pub fn len(&self) -> usize {
        self.loaders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.loaders.is_empty()
    }

    /// Decode a global ID and require its type to be registered.
    pub fn decode_id(&self, id: &str) -> Result<GlobalId, DecodeError> {
        let gid = GlobalId::decode(id)?;
        if !self.contains(gid.type_tag()) {
            return Err(DecodeError::UnregisteredType(gid.type_tag().to_string()));
        }
        Ok(gid)
    }
}

/// Builder for [`NodeRegistry`].
///
/// Registration errors are fatal; a registry is only produced once every
/// loader registered cleanly.
pub struct NodeRegistryBuilder<N: Send> {
    loaders: HashMap<&'static str, Arc<dyn NodeLoader<N>>>,
}

impl<N: Send> NodeRegistryBuilder<N> {
    pub fn new() -> Self {
        Self {
            loaders: HashMap::new(),
        }
    }

    /// Register a loader under its type tag.
    pub fn register(&mut self, loader: Arc<dyn NodeLoader<N>>) -> Result<(), RegistryError> {
        let tag = loader.type_tag();
        if !is_valid_type_tag(tag) {
            return Err(RegistryError::InvalidTypeTag(tag.to_string()));
        }
        if self.loaders.contains_key(tag) {
            return Err(RegistryError::DuplicateRegistration(tag.to_string()));
        }
        info!(type_tag = tag, key = %loader.key_kind(), "🧩 Registering node type");
        self.loaders.insert(tag, loader);
        Ok(())
    }

    /// Register a loader, builder style.
    pub fn with(mut self, loader: Arc<dyn NodeLoader<N>>) -> Result<Self, RegistryError> {
        self.register(loader)?;
        Ok(self)
    }

    pub fn build(self) -> NodeRegistry<N> {
        NodeRegistry {
            loaders: self.loaders,
        }
    }
}

impl<N: Send> Default for NodeRegistryBuilder<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockLoader(&'static str);

    #[async_trait]
    impl NodeLoader<String> for MockLoader {
        fn type_tag(&self) -> &'static str {
            self.0
        }
        fn key_kind(&self) -> KeyKind {
            KeyKind::Int
        }
        async fn load_one(&self, key: &RawKey) -> StorageResult<Option<String>> {
            Ok(Some(format!("{}#{}", self.0, key)))
        }
    }

    // Test critique: double enregistrement = erreur fatale au démarrage
    #[test]
    fn test_duplicate_registration_rejected() {
        let mut builder = NodeRegistry::<String>::builder();
        builder.register(Arc::new(MockLoader("User"))).unwrap();
        let err = builder.register(Arc::new(MockLoader("User"))).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateRegistration("User".into()));
    }

    #[test]
    fn test_invalid_type_tag_rejected() {
        let err = NodeRegistry::<String>::builder()
            .with(Arc::new(MockLoader("Us:er")))
            .err();
        assert_eq!(err, Some(RegistryError::InvalidTypeTag("Us:er".into())));
    }

    #[test]
    fn test_lookup_and_tags() {
        let registry = NodeRegistry::<String>::builder()
            .with(Arc::new(MockLoader("Video")))
            .and_then(|b| b.with(Arc::new(MockLoader("User"))))
            .unwrap()
            .build();

        assert_eq!(registry.type_tags(), vec!["User", "Video"]);
        assert!(registry.lookup("User").is_ok());
        assert_eq!(
            registry.lookup("Ghost").err(),
            Some(RegistryError::NotFound("Ghost".into()))
        );
    }

    // Test critique: decode_id refuse un type non enregistré
    #[test]
    fn test_decode_id_requires_registered_type() {
        let registry = NodeRegistry::<String>::builder()
            .with(Arc::new(MockLoader("User")))
            .unwrap()
            .build();

        let user = GlobalId::new("User", 1i64).encode();
        assert_eq!(registry.decode_id(&user).unwrap().type_tag(), "User");

        let ghost = GlobalId::new("Ghost", 1i64).encode();
        assert_eq!(
            registry.decode_id(&ghost).unwrap_err(),
            DecodeError::UnregisteredType("Ghost".into())
        );
    }

    // Test critique: le load_many par défaut préserve l'ordre
    #[tokio::test]
    async fn test_default_load_many_preserves_order() {
        let loader = MockLoader("User");
        let nodes = loader
            .load_many(&[RawKey::Int(3), RawKey::Int(1)])
            .await
            .unwrap();
        assert_eq!(nodes, vec![Some("User#3".into()), Some("User#1".into())]);
    }
}
