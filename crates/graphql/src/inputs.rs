//! Input types: connection ordering and `where` filters.
//!
//! Both inputs are translated into storage-neutral core types here, so
//! resolvers only see [`OrderSpec`] and [`Filter`] values. ID fields take
//! global IDs and are checked against the entity type of the connection.

use async_graphql::{Enum, InputObject, ID};
use chrono::{DateTime, Utc};

use waypoint_core::error::{DecodeError, DomainError, DomainResult};
use waypoint_core::metrics::record_id_decode_error;
use waypoint_core::models::{self, FieldValue, NodeType, RawKey, ValueKind};
use waypoint_core::ports::{Filter, NodeRegistry, OrderDirection, OrderSpec, SortKey};

use crate::types::Node;

/// Maximum length for string filter parameters.
pub(crate) const MAX_FILTER_STRING_LENGTH: usize = 128;

// =============================================================================
// Ordering
// =============================================================================

/// Ordering direction.
#[derive(Enum, Clone, Copy, Debug, Default, PartialEq, Eq)]
#[graphql(name = "OrderDirection")]
pub enum Order {
    #[default]
    Asc,
    Desc,
}

impl From<Order> for OrderDirection {
    fn from(order: Order) -> Self {
        match order {
            Order::Asc => OrderDirection::Asc,
            Order::Desc => OrderDirection::Desc,
        }
    }
}

const NAME: SortKey = SortKey::new("name", ValueKind::Text);
const CREATED_AT: SortKey = SortKey::new("created_at", ValueKind::Timestamp);

/// Generate the ordering field enum and `orderBy` input of one entity.
macro_rules! define_order_input {
    ($field:ident, $input:ident, $id_kind:expr) => {
        /// Field a connection can be ordered by.
        #[derive(Enum, Clone, Copy, Debug, Default, PartialEq, Eq)]
        pub enum $field {
            #[default]
            Id,
            Name,
            CreatedAt,
        }

        /// Ordering of a connection. Ties are broken by ID.
        #[derive(InputObject, Clone, Copy, Debug, Default)]
        pub struct $input {
            #[graphql(default)]
            pub field: $field,
            #[graphql(default)]
            pub direction: Order,
        }

        impl $input {
            pub fn order_spec(&self) -> OrderSpec {
                let id = SortKey::new("id", $id_kind);
                let key = match self.field {
                    $field::Id => id,
                    $field::Name => NAME,
                    $field::CreatedAt => CREATED_AT,
                };
                OrderSpec::new(key, id, self.direction.into())
            }
        }
    };
}

define_order_input!(UserOrderField, UserOrder, ValueKind::Int);
define_order_input!(VideoOrderField, VideoOrder, ValueKind::Uuid);

// =============================================================================
// Filters
// =============================================================================

/// Generate the `where` input of one entity.
macro_rules! define_where_input {
    ($input:ident, $model:ty) => {
        /// Filter on a connection. All given fields must match.
        #[derive(InputObject, Clone, Debug, Default)]
        pub struct $input {
            pub id: Option<ID>,
            pub id_in: Option<Vec<ID>>,
            #[graphql(name = "idNEQ")]
            pub id_neq: Option<ID>,
            pub name: Option<String>,
            #[graphql(name = "nameNEQ")]
            pub name_neq: Option<String>,
            pub name_contains: Option<String>,
            pub name_has_prefix: Option<String>,
            #[graphql(name = "createdAtGT")]
            pub created_at_gt: Option<DateTime<Utc>>,
            #[graphql(name = "createdAtLT")]
            pub created_at_lt: Option<DateTime<Utc>>,
            pub not: Option<Box<$input>>,
            pub and: Option<Vec<$input>>,
            pub or: Option<Vec<$input>>,
        }

        impl $input {
            /// Translate into a filter, decoding every global ID.
            pub fn to_filter(&self, registry: &NodeRegistry<Node>) -> DomainResult<Filter> {
                let key = |id: &ID| node_key::<$model>(registry, id).map(FieldValue::from);
                let mut filters = Vec::new();

                if let Some(id) = &self.id {
                    filters.push(Filter::Eq("id", key(id)?));
                }
                if let Some(ids) = &self.id_in {
                    let keys = ids.iter().map(key).collect::<DomainResult<Vec<_>>>()?;
                    filters.push(Filter::In("id", keys));
                }
                if let Some(id) = &self.id_neq {
                    filters.push(Filter::Neq("id", key(id)?));
                }
                if let Some(name) = &self.name {
                    filters.push(Filter::Eq("name", validate_filter_string(name, "name")?.into()));
                }
                if let Some(name) = &self.name_neq {
                    filters.push(Filter::Neq("name", validate_filter_string(name, "nameNEQ")?.into()));
                }
                if let Some(s) = &self.name_contains {
                    let s = validate_filter_string(s, "nameContains")?;
                    filters.push(Filter::Contains("name", s.to_string()));
                }
                if let Some(s) = &self.name_has_prefix {
                    let s = validate_filter_string(s, "nameHasPrefix")?;
                    filters.push(Filter::HasPrefix("name", s.to_string()));
                }
                if let Some(t) = self.created_at_gt {
                    filters.push(Filter::Gt("created_at", t.into()));
                }
                if let Some(t) = self.created_at_lt {
                    filters.push(Filter::Lt("created_at", t.into()));
                }
                if let Some(not) = &self.not {
                    filters.push(Filter::Not(Box::new(not.to_filter(registry)?)));
                }
                if let Some(and) = &self.and {
                    let all = and
                        .iter()
                        .map(|w| w.to_filter(registry))
                        .collect::<DomainResult<Vec<_>>>()?;
                    filters.push(Filter::all_of(all));
                }
                if let Some(or) = &self.or {
                    let any = or
                        .iter()
                        .map(|w| w.to_filter(registry))
                        .collect::<DomainResult<Vec<_>>>()?;
                    filters.push(Filter::Or(any));
                }

                Ok(Filter::all_of(filters))
            }
        }
    };
}

define_where_input!(UserWhereInput, models::User);
define_where_input!(VideoWhereInput, models::Video);

// -----------------------------------------------------------------------------
// Helpers & Validation
// -----------------------------------------------------------------------------

/// Decode a global ID that must name an entity of type `M`.
pub(crate) fn node_key<M: NodeType>(registry: &NodeRegistry<Node>, id: &str) -> DomainResult<RawKey> {
    let (type_tag, key) = registry
        .decode_id(id)
        .inspect_err(|_| record_id_decode_error())?
        .into_parts();

    if type_tag != M::TYPE_TAG {
        return Err(DecodeError::WrongType {
            expected: M::TYPE_TAG,
            found: type_tag,
        }
        .into());
    }

    let expected = registry.lookup(M::TYPE_TAG)?.key_kind();
    if key.kind() != expected {
        return Err(DecodeError::InvalidKey {
            kind: expected.as_str(),
            value: key.to_string(),
        }
        .into());
    }

    Ok(key)
}

/// Validate a filter string parameter.
fn validate_filter_string<'a>(value: &'a str, field_name: &str) -> DomainResult<&'a str> {
    if value.len() > MAX_FILTER_STRING_LENGTH {
        return Err(DomainError::Validation(format!(
            "{} too long: maximum {} characters allowed",
            field_name, MAX_FILTER_STRING_LENGTH
        )));
    }
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use uuid::Uuid;
    use waypoint_core::ids::GlobalId;
    use waypoint_storage::MemoryRepositories;

    use crate::registry::build_node_registry;

    fn registry() -> NodeRegistry<Node> {
        build_node_registry(Arc::new(MemoryRepositories::new())).unwrap()
    }

    fn user_id(id: i64) -> ID {
        ID(GlobalId::new("User", id).encode())
    }

    #[test]
    fn test_default_order_is_id_asc() {
        let spec = UserOrder::default().order_spec();
        assert_eq!(spec.fingerprint(), "id:ASC");

        let spec = VideoOrder {
            field: VideoOrderField::Name,
            direction: Order::Desc,
        }
        .order_spec();
        assert_eq!(spec.fingerprint(), "name,id:DESC");
        assert_eq!(spec.keys()[1].kind, ValueKind::Uuid);
    }

    #[test]
    fn test_where_input_builds_conjunction() {
        let input = UserWhereInput {
            id_in: Some(vec![user_id(1), user_id(2)]),
            name_has_prefix: Some("U".into()),
            not: Some(Box::new(UserWhereInput {
                name: Some("U2".into()),
                ..Default::default()
            })),
            ..Default::default()
        };

        let filter = input.to_filter(&registry()).unwrap();
        assert_eq!(
            filter,
            Filter::And(vec![
                Filter::In("id", vec![1i64.into(), 2i64.into()]),
                Filter::HasPrefix("name", "U".into()),
                Filter::Not(Box::new(Filter::Eq("name", "U2".into()))),
            ])
        );
    }

    #[test]
    fn test_empty_where_input_matches_all() {
        assert_eq!(UserWhereInput::default().to_filter(&registry()).unwrap(), Filter::All);
    }

    // Test critique: un ID d'un autre type est refusé au lieu de filtrer à vide
    #[test]
    fn test_id_of_other_type_is_rejected() {
        let input = UserWhereInput {
            id: Some(ID(GlobalId::new("Video", Uuid::nil()).encode())),
            ..Default::default()
        };
        let err = input.to_filter(&registry()).unwrap_err();
        assert_eq!(err.code(), "INVALID_ID");
        assert!(err.to_string().contains("Expected a User ID"));
    }

    #[test]
    fn test_id_with_wrong_key_kind_is_rejected() {
        let input = UserWhereInput {
            id: Some(ID(GlobalId::new("User", Uuid::nil()).encode())),
            ..Default::default()
        };
        assert_eq!(input.to_filter(&registry()).unwrap_err().code(), "INVALID_ID");
    }

    #[test]
    fn test_unregistered_type_and_garbage_ids() {
        let ghost = UserWhereInput {
            id: Some(ID(GlobalId::new("Ghost", 1i64).encode())),
            ..Default::default()
        };
        assert_eq!(ghost.to_filter(&registry()).unwrap_err().code(), "UNKNOWN_TYPE");

        let garbage = UserWhereInput {
            id: Some(ID("%%%".into())),
            ..Default::default()
        };
        assert_eq!(garbage.to_filter(&registry()).unwrap_err().code(), "INVALID_ID");
    }

    #[test]
    fn test_filter_string_length_limit() {
        let input = UserWhereInput {
            name_contains: Some("x".repeat(MAX_FILTER_STRING_LENGTH + 1)),
            ..Default::default()
        };
        assert_eq!(input.to_filter(&registry()).unwrap_err().code(), "VALIDATION");
    }
}
