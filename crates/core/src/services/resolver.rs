//! Node resolver - polymorphic lookup by global ID.
//!
//! `node(id)` decodes the ID, dispatches on its type tag through the
//! [`NodeRegistry`] and loads a single entity. `nodes(ids)` groups the IDs
//! by type so each loader sees one batched call, runs the groups
//! concurrently, then scatters the results back into request order.

use std::collections::BTreeMap;
use std::sync::Arc;

use futures::future::try_join_all;
use tracing::{debug, instrument};

use crate::error::{ResolveError, ResolveResult, StorageError};
use crate::ids::GlobalId;
use crate::metrics::{record_id_decode_error, record_node_lookup};
use crate::models::RawKey;
use crate::ports::{NodeLoader, NodeRegistry};

/// Resolves global IDs to nodes through a shared registry.
pub struct NodeResolver<N: Send> {
    registry: Arc<NodeRegistry<N>>,
}

impl<N: Send> Clone for NodeResolver<N> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

struct Group<N: Send> {
    loader: Arc<dyn NodeLoader<N>>,
    positions: Vec<usize>,
    keys: Vec<RawKey>,
}

impl<N: Send + 'static> NodeResolver<N> {
    pub fn new(registry: Arc<NodeRegistry<N>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &NodeRegistry<N> {
        &self.registry
    }

    /// Resolve one node.
    ///
    /// A well-formed ID whose entity no longer exists yields `Ok(None)`.
    #[instrument(skip(self))]
    pub async fn resolve_node(&self, id: &str) -> ResolveResult<Option<N>> {
        let (loader, key) = match self.prepare(id) {
            Ok(prepared) => prepared,
            Err(e) => {
                record_node_lookup("unknown", "invalid");
                return Err(e);
            }
        };

        let tag = loader.type_tag();
        match loader.load_one(&key).await {
            Ok(node) => {
                record_node_lookup(tag, if node.is_some() { "found" } else { "missing" });
                Ok(node)
            }
            Err(e) => {
                record_node_lookup(tag, "error");
                Err(e.into())
            }
        }
    }

    /// Resolve several nodes, preserving input order.
    ///
    /// IDs that fail to decode, name an unknown type or point at a missing
    /// entity become `None`. A storage failure in any type group fails the
    /// whole call.
    #[instrument(skip_all, fields(count = ids.len()))]
    pub async fn resolve_nodes<S: AsRef<str>>(&self, ids: &[S]) -> ResolveResult<Vec<Option<N>>> {
        let mut groups: BTreeMap<&'static str, Group<N>> = BTreeMap::new();

        for (position, id) in ids.iter().enumerate() {
            match self.prepare(id.as_ref()) {
                Ok((loader, key)) => {
                    let group = groups.entry(loader.type_tag()).or_insert_with(|| Group {
                        loader,
                        positions: Vec::new(),
                        keys: Vec::new(),
                    });
                    group.positions.push(position);
                    group.keys.push(key);
                }
                Err(e) => {
                    debug!(position, error = %e, "Unresolvable ID in batch");
                    record_node_lookup("unknown", "invalid");
                }
            }
        }

        debug!(groups = groups.len(), "Loading node groups");

        let loads = groups.into_values().map(|group| async move {
            let tag = group.loader.type_tag();
            let nodes = group.loader.load_many(&group.keys).await.inspect_err(|_| {
                record_node_lookup(tag, "error");
            })?;
            if nodes.len() != group.keys.len() {
                return Err(StorageError::QueryError(format!(
                    "loader for {} returned {} results for {} keys",
                    tag,
                    nodes.len(),
                    group.keys.len()
                )));
            }
            Ok::<_, StorageError>((tag, group.positions, nodes))
        });
        let loaded = try_join_all(loads).await?;

        let mut out: Vec<Option<N>> = std::iter::repeat_with(|| None).take(ids.len()).collect();
        for (tag, positions, nodes) in loaded {
            for (position, node) in positions.into_iter().zip(nodes) {
                record_node_lookup(tag, if node.is_some() { "found" } else { "missing" });
                out[position] = node;
            }
        }
        Ok(out)
    }

    /// Decode an ID and pick its loader.
    fn prepare(&self, id: &str) -> ResolveResult<(Arc<dyn NodeLoader<N>>, RawKey)> {
        let (type_tag, key) = GlobalId::decode(id)
            .inspect_err(|_| record_id_decode_error())?
            .into_parts();

        let loader = self
            .registry
            .lookup(&type_tag)
            .map_err(|_| ResolveError::UnknownType(type_tag.clone()))?;

        if loader.key_kind() != key.kind() {
            return Err(ResolveError::KeyKindMismatch {
                type_tag,
                expected: loader.key_kind().as_str(),
                found: key.kind().as_str(),
            });
        }

        Ok((Arc::clone(loader), key))
    }
}
