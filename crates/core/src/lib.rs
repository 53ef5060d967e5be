//! Core domain layer for waypoint.
//!
//! This crate contains the domain models, codecs, port traits (interfaces)
//! and services behind a Relay-style GraphQL API: globally unique object
//! IDs, polymorphic `node` lookup, and cursor-paginated connections. It
//! follows hexagonal architecture principles - this is the innermost layer
//! with no dependencies on infrastructure.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     waypoint (binary)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    waypoint-graphql                         │
//! │               (schema, Node interface, HTTP)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │                    waypoint-storage                         │
//! │               (PostgreSQL, in-memory)                       │
//! ├─────────────────────────────────────────────────────────────┤
//! │                     waypoint-core  ← YOU ARE HERE           │
//! │          (models, codecs, ports, services)                  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Modules
//!
//! - [`models`] - Domain models (User, Video) and raw keys
//! - [`ids`] - Global ID codec
//! - [`cursor`] - Cursor codec
//! - [`ports`] - Interface traits for adapters to implement
//! - [`services`] - Node resolver and connection paginator
//! - [`error`] - Domain error types
//! - [`metrics`] - Prometheus metrics definitions
//!
//! # Key Concepts
//!
//! ## Global IDs
//!
//! Every entity exposed through the node interface has an opaque
//! [`ids::GlobalId`] embedding its type tag and native key. IDs are
//! deterministic and survive restarts.
//!
//! ## Node Registry
//!
//! Each entity type implements [`ports::NodeLoader`] and is registered once
//! in a [`ports::NodeRegistry`] at startup. The [`services::NodeResolver`]
//! dispatches on the type tag of an ID, batching `nodes(ids)` per type.
//!
//! ## Connections
//!
//! Storage adapters expose a [`ports::RangeSource`] over a read snapshot;
//! [`services::paginate`] counts the filtered set, fetches a look-ahead row past
//! the window, and builds edges with cursors from [`cursor`].

pub mod cursor;
pub mod error;
pub mod ids;
pub mod metrics;
pub mod models;
pub mod ports;
pub mod services;
