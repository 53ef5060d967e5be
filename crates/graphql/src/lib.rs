//! Relay-compliant GraphQL API for waypoint.
//!
//! Exposes the `Node` interface (`node`, `nodes`), one connection per
//! entity type (`users`, `videos`) with `first`/`after`/`last`/`before`,
//! `where` and `orderBy` arguments, and create/delete mutations.
//!
//! # Building a Schema
//!
//! ```ignore
//! use std::sync::Arc;
//! use waypoint_core::ports::PaginationConfig;
//! use waypoint_graphql::{build_node_registry, build_schema};
//!
//! let registry = Arc::new(build_node_registry(Arc::clone(&repositories))?);
//! let schema = build_schema(repositories, registry, PaginationConfig::default());
//! ```
//!
//! Errors carry a machine-readable `code` extension (`INVALID_ID`,
//! `UNKNOWN_TYPE`, `INVALID_CURSOR`, ...).

mod error;
mod inputs;
mod registry;
mod schema;
mod server;
mod types;

pub use inputs::{
    Order, UserOrder, UserOrderField, UserWhereInput, VideoOrder, VideoOrderField,
    VideoWhereInput,
};
pub use registry::{build_node_registry, UserLoader, VideoLoader};
pub use schema::{
    build_schema, schema_builder, CreateUserInput, CreateVideoInput, Mutation, Query,
    MAX_NAME_LENGTH, MAX_QUERY_DEPTH,
};
pub use server::{router, serve, serve_with_shutdown, ServerConfig};
pub use types::{
    Cursor, Node, PageInfo, User, UserConnection, UserEdge, Video, VideoConnection, VideoEdge,
    WaypointSchema,
};
