//! Mapping of domain errors onto GraphQL errors.

use async_graphql::ErrorExtensions;
use tracing::{debug, error};

use waypoint_core::error::{DomainError, ResolveError};

/// Convert a domain error into a field error carrying a `code` extension.
///
/// Storage failures are logged at error level; everything else is client
/// input and only traced.
pub(crate) fn to_gql_error(err: impl Into<DomainError>) -> async_graphql::Error {
    let err = err.into();
    let code = err.code();

    match &err {
        DomainError::Storage(_) | DomainError::Resolve(ResolveError::Storage(_)) => {
            error!(code, error = %err, "Request failed in storage")
        }
        _ => debug!(code, error = %err, "Request rejected"),
    }

    async_graphql::Error::new(err.to_string()).extend_with(|_, ext| ext.set("code", code))
}
