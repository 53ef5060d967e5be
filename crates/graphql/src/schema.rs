//! GraphQL schema definition.
//!
//! Root fields: `node`/`nodes` for lookup by global ID, one connection per
//! entity type, and create/delete mutations.

use std::sync::Arc;

use async_graphql::{Context, EmptySubscription, InputObject, Object, Result, Schema, SchemaBuilder, ID};
use tracing::info;

use waypoint_core::error::DomainError;
use waypoint_core::models::{self, NewUser, NewVideo};
use waypoint_core::ports::{NodeRegistry, Pagination, PaginationConfig, Repositories};
use waypoint_core::services::{NodeResolver, Paginator};

use crate::error::to_gql_error;
use crate::inputs::{node_key, UserOrder, UserWhereInput, VideoOrder, VideoWhereInput};
use crate::types::{Cursor, Node, User, UserConnection, Video, VideoConnection, WaypointSchema};

// -----------------------------------------------------------------------------
// Schema Configuration
// -----------------------------------------------------------------------------

/// Maximum query depth to prevent deeply nested queries (DoS protection).
/// Note: GraphQL introspection requires depth ~13, so we use 15 to allow it.
pub const MAX_QUERY_DEPTH: usize = 15;

/// Maximum length of an entity name.
pub const MAX_NAME_LENGTH: usize = 255;

// -----------------------------------------------------------------------------
// Schema Builder
// -----------------------------------------------------------------------------

/// Create a schema builder with repositories, resolver and paginator data.
///
/// Remember to call `.limit_depth()` before `.finish()`.
pub fn schema_builder<R: Repositories + 'static>(
    repositories: Arc<R>,
    registry: Arc<NodeRegistry<Node>>,
    pagination: PaginationConfig,
) -> SchemaBuilder<Query, Mutation, EmptySubscription> {
    let repos: Arc<dyn Repositories> = repositories;
    Schema::build(Query, Mutation, EmptySubscription)
        .data(repos)
        .data(NodeResolver::new(registry))
        .data(Paginator::new(pagination))
}

/// Build the schema with the query depth limit applied.
pub fn build_schema<R: Repositories + 'static>(
    repositories: Arc<R>,
    registry: Arc<NodeRegistry<Node>>,
    pagination: PaginationConfig,
) -> WaypointSchema {
    schema_builder(repositories, registry, pagination)
        .limit_depth(MAX_QUERY_DEPTH)
        .finish()
}

// -----------------------------------------------------------------------------
// Query
// -----------------------------------------------------------------------------

/// Query root.
#[derive(Default)]
pub struct Query;

#[Object]
impl Query {
    /// Fetch an object by its global ID.
    ///
    /// Returns null if the object does not exist (anymore).
    async fn node<'ctx>(&self, ctx: &Context<'ctx>, id: ID) -> Result<Option<Node>> {
        let resolver = ctx.data::<NodeResolver<Node>>()?;
        resolver.resolve_node(&id).await.map_err(to_gql_error)
    }

    /// Fetch several objects by global ID, in the order given.
    ///
    /// Unknown, malformed or missing IDs yield null at their position.
    async fn nodes<'ctx>(&self, ctx: &Context<'ctx>, ids: Vec<ID>) -> Result<Vec<Option<Node>>> {
        let resolver = ctx.data::<NodeResolver<Node>>()?;
        let ids: Vec<&str> = ids.iter().map(|id| id.as_str()).collect();
        resolver.resolve_nodes(&ids).await.map_err(to_gql_error)
    }

    /// List users with pagination, filtering and ordering.
    #[allow(clippy::too_many_arguments)]
    async fn users<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        first: Option<i32>,
        after: Option<Cursor>,
        last: Option<i32>,
        before: Option<Cursor>,
        #[graphql(name = "where")] filter: Option<UserWhereInput>,
        order_by: Option<UserOrder>,
    ) -> Result<UserConnection> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let resolver = ctx.data::<NodeResolver<Node>>()?;
        let paginator = ctx.data::<Paginator>()?;

        let pagination = pagination_args(first, after, last, before);
        let window = paginator
            .window(&pagination, order_by.unwrap_or_default().order_spec())
            .map_err(to_gql_error)?;
        let filter = filter
            .map(|w| w.to_filter(resolver.registry()))
            .transpose()
            .map_err(to_gql_error)?
            .unwrap_or_default();

        let connection = repos
            .users()
            .list_users(&filter, &window)
            .await
            .map_err(to_gql_error)?;

        Ok(UserConnection::from(connection))
    }

    /// List videos with pagination, filtering and ordering.
    #[allow(clippy::too_many_arguments)]
    async fn videos<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        first: Option<i32>,
        after: Option<Cursor>,
        last: Option<i32>,
        before: Option<Cursor>,
        #[graphql(name = "where")] filter: Option<VideoWhereInput>,
        order_by: Option<VideoOrder>,
    ) -> Result<VideoConnection> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let resolver = ctx.data::<NodeResolver<Node>>()?;
        let paginator = ctx.data::<Paginator>()?;

        let pagination = pagination_args(first, after, last, before);
        let window = paginator
            .window(&pagination, order_by.unwrap_or_default().order_spec())
            .map_err(to_gql_error)?;
        let filter = filter
            .map(|w| w.to_filter(resolver.registry()))
            .transpose()
            .map_err(to_gql_error)?
            .unwrap_or_default();

        let connection = repos
            .videos()
            .list_videos(&filter, &window)
            .await
            .map_err(to_gql_error)?;

        Ok(VideoConnection::from(connection))
    }
}

// -----------------------------------------------------------------------------
// Mutation
// -----------------------------------------------------------------------------

#[derive(InputObject)]
pub struct CreateUserInput {
    pub name: String,
}

#[derive(InputObject)]
pub struct CreateVideoInput {
    pub name: String,
}

/// Mutation root.
#[derive(Default)]
pub struct Mutation;

#[Object]
impl Mutation {
    async fn create_user<'ctx>(&self, ctx: &Context<'ctx>, input: CreateUserInput) -> Result<User> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let name = validate_name(input.name).map_err(to_gql_error)?;

        let user = repos
            .users()
            .create_user(NewUser { name })
            .await
            .map_err(to_gql_error)?;

        info!(id = user.id, "👤 User created");
        Ok(User(user))
    }

    async fn create_video<'ctx>(
        &self,
        ctx: &Context<'ctx>,
        input: CreateVideoInput,
    ) -> Result<Video> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let name = validate_name(input.name).map_err(to_gql_error)?;

        let video = repos
            .videos()
            .create_video(NewVideo { name })
            .await
            .map_err(to_gql_error)?;

        info!(id = %video.id, "🎬 Video created");
        Ok(Video(video))
    }

    /// Delete a user. Returns false if it did not exist.
    async fn delete_user<'ctx>(&self, ctx: &Context<'ctx>, id: ID) -> Result<bool> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let resolver = ctx.data::<NodeResolver<Node>>()?;

        let key = node_key::<models::User>(resolver.registry(), &id).map_err(to_gql_error)?;
        let Some(id) = key.as_int() else {
            return Ok(false);
        };
        repos.users().delete_user(id).await.map_err(to_gql_error)
    }

    /// Delete a video. Returns false if it did not exist.
    async fn delete_video<'ctx>(&self, ctx: &Context<'ctx>, id: ID) -> Result<bool> {
        let repos = ctx.data::<Arc<dyn Repositories>>()?;
        let resolver = ctx.data::<NodeResolver<Node>>()?;

        let key = node_key::<models::Video>(resolver.registry(), &id).map_err(to_gql_error)?;
        let Some(id) = key.as_uuid() else {
            return Ok(false);
        };
        repos.videos().delete_video(id).await.map_err(to_gql_error)
    }
}

// -----------------------------------------------------------------------------
// Helpers & Validation
// -----------------------------------------------------------------------------

fn pagination_args(
    first: Option<i32>,
    after: Option<Cursor>,
    last: Option<i32>,
    before: Option<Cursor>,
) -> Pagination {
    Pagination {
        first,
        after: after.map(Into::into),
        last,
        before: before.map(Into::into),
    }
}

/// Validate and normalize an entity name.
fn validate_name(name: String) -> Result<String, DomainError> {
    let name = name.trim().to_string();
    if name.is_empty() {
        return Err(DomainError::Validation("name cannot be empty".into()));
    }
    if name.len() > MAX_NAME_LENGTH {
        return Err(DomainError::Validation(format!(
            "name too long: maximum {} characters allowed",
            MAX_NAME_LENGTH
        )));
    }
    Ok(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    // Tests de validation critiques

    #[test]
    fn test_validate_name_boundaries() {
        // Vide = erreur
        assert!(validate_name("   ".into()).is_err());
        // Trop long = erreur (DoS prevention)
        assert!(validate_name("x".repeat(MAX_NAME_LENGTH + 1)).is_err());
        // Espaces retirés
        assert_eq!(validate_name("  U1 ".into()).unwrap(), "U1");
    }

    #[test]
    fn test_pagination_args_keep_cursors() {
        let args = pagination_args(Some(2), Some(Cursor("a".into())), None, Some(Cursor("b".into())));
        assert_eq!(args.first, Some(2));
        assert_eq!(args.after.map(|c| c.value).as_deref(), Some("a"));
        assert_eq!(args.before.map(|c| c.value).as_deref(), Some("b"));
        assert!(args.last.is_none());
    }
}
