//! GraphQL type definitions.

use async_graphql::{
    EmptySubscription, InputValueError, InputValueResult, Interface, Object, Scalar, ScalarType,
    Schema, SimpleObject, Value, ID,
};
use chrono::{DateTime, Utc};

use waypoint_core::models::{self, NodeType};
use waypoint_core::ports;

use crate::schema::{Mutation, Query};

/// The GraphQL schema type.
pub type WaypointSchema = Schema<Query, Mutation, EmptySubscription>;

// =============================================================================
// Node Interface
// =============================================================================

/// An object with a globally unique ID.
#[derive(Interface)]
#[graphql(field(name = "id", ty = "ID", desc = "Globally unique, opaque identifier."))]
pub enum Node {
    User(User),
    Video(Video),
}

/// A user account.
pub struct User(pub models::User);

#[Object]
impl User {
    async fn id(&self) -> ID {
        ID(self.0.global_id().encode())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }
}

impl From<models::User> for User {
    fn from(user: models::User) -> Self {
        Self(user)
    }
}

/// A video.
pub struct Video(pub models::Video);

#[Object]
impl Video {
    async fn id(&self) -> ID {
        ID(self.0.global_id().encode())
    }

    async fn name(&self) -> &str {
        &self.0.name
    }

    async fn created_at(&self) -> DateTime<Utc> {
        self.0.created_at
    }
}

impl From<models::Video> for Video {
    fn from(video: models::Video) -> Self {
        Self(video)
    }
}

// =============================================================================
// Cursor Scalar
// =============================================================================

/// Opaque pagination cursor.
///
/// Distinct from `ID`: a cursor names a position in one ordering of one
/// connection and cannot be used to look a node up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor(pub String);

#[Scalar(name = "Cursor")]
impl ScalarType for Cursor {
    fn parse(value: Value) -> InputValueResult<Self> {
        match value {
            Value::String(s) => Ok(Cursor(s)),
            other => Err(InputValueError::expected_type(other)),
        }
    }

    fn to_value(&self) -> Value {
        Value::String(self.0.clone())
    }
}

impl From<ports::Cursor> for Cursor {
    fn from(cursor: ports::Cursor) -> Self {
        Self(cursor.value)
    }
}

impl From<Cursor> for ports::Cursor {
    fn from(cursor: Cursor) -> Self {
        ports::Cursor { value: cursor.0 }
    }
}

// -----------------------------------------------------------------------------
// Connection Types (Relay-style pagination)
// -----------------------------------------------------------------------------

#[derive(SimpleObject)]
pub struct PageInfo {
    pub has_next_page: bool,
    pub has_previous_page: bool,
    pub start_cursor: Option<Cursor>,
    pub end_cursor: Option<Cursor>,
}

impl From<ports::PageInfo> for PageInfo {
    fn from(info: ports::PageInfo) -> Self {
        Self {
            has_next_page: info.has_next_page,
            has_previous_page: info.has_previous_page,
            start_cursor: info.start_cursor.map(Cursor::from),
            end_cursor: info.end_cursor.map(Cursor::from),
        }
    }
}

/// Generate Relay-style connection types (Edge + Connection) with From impl.
macro_rules! define_connection {
    ($node:ident, $core_model:ty, $edge:ident, $connection:ident) => {
        #[derive(SimpleObject)]
        pub struct $edge {
            pub node: $node,
            pub cursor: Cursor,
        }

        #[derive(SimpleObject)]
        pub struct $connection {
            pub edges: Vec<$edge>,
            pub page_info: PageInfo,
            /// Number of items matching the filter, regardless of pagination.
            pub total_count: i64,
        }

        impl From<ports::Connection<$core_model>> for $connection {
            fn from(conn: ports::Connection<$core_model>) -> Self {
                Self {
                    edges: conn
                        .edges
                        .into_iter()
                        .map(|e| $edge {
                            node: $node::from(e.node),
                            cursor: Cursor::from(e.cursor),
                        })
                        .collect(),
                    page_info: PageInfo::from(conn.page_info),
                    total_count: conn.total_count,
                }
            }
        }
    };
}

define_connection!(User, models::User, UserEdge, UserConnection);
define_connection!(Video, models::Video, VideoEdge, VideoConnection);

#[cfg(test)]
mod tests {
    use super::*;
    use waypoint_core::ports::{Edge, PageInfo as CorePageInfo};

    // Test critique: la conversion de connexion garde l'ordre et les curseurs
    #[test]
    fn test_connection_conversion_preserves_edges() {
        let now = Utc::now();
        let edge = |id: i64| Edge {
            node: models::User {
                id,
                name: format!("U{}", id),
                created_at: now,
            },
            cursor: ports::Cursor {
                value: format!("c{}", id),
            },
        };
        let conn = ports::Connection {
            edges: vec![edge(1), edge(2)],
            page_info: CorePageInfo {
                has_next_page: true,
                has_previous_page: false,
                start_cursor: Some(ports::Cursor { value: "c1".into() }),
                end_cursor: Some(ports::Cursor { value: "c2".into() }),
            },
            total_count: 7,
        };

        let gql = UserConnection::from(conn);
        assert_eq!(gql.total_count, 7);
        assert_eq!(gql.edges.len(), 2);
        assert_eq!(gql.edges[1].node.0.id, 2);
        assert_eq!(gql.edges[0].cursor, Cursor("c1".into()));
        assert_eq!(gql.page_info.end_cursor, Some(Cursor("c2".into())));
        assert!(gql.page_info.has_next_page);
    }

    #[test]
    fn test_cursor_scalar_rejects_non_strings() {
        assert!(<Cursor as ScalarType>::parse(Value::Number(1.into())).is_err());
        assert_eq!(
            <Cursor as ScalarType>::parse(Value::String("abc".into())).ok(),
            Some(Cursor("abc".into()))
        );
    }
}
