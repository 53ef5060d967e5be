//! Error types for the waypoint domain layer.
//!
//! This module defines a hierarchy of error types:
//!
//! - [`DecodeError`] - Malformed or unrecognized global IDs
//! - [`CursorError`] - Malformed cursors or cursors issued under another ordering
//! - [`RegistryError`] - Node registry misconfiguration
//! - [`PaginationError`] - Client misuse of pagination arguments
//! - [`ResolveError`] - Failures of `node` lookups
//! - [`StorageError`] - Database/repository errors
//! - [`DomainError`] - Top-level error wrapping all of the above
//!
//! Error conversion is automatic via `From` implementations,
//! allowing `?` to work across error boundaries.

use thiserror::Error;

// =============================================================================
// Global ID Errors
// =============================================================================

/// A string could not be decoded into a global ID.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DecodeError {
    /// Input is longer than any ID the codec produces.
    #[error("ID too long: maximum {max} characters allowed")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },

    /// Input is not valid base64url.
    #[error("ID is not valid base64url: {0}")]
    Encoding(String),

    /// Decoded payload does not have the `tag:kind:value` structure.
    #[error("Malformed ID payload: {0}")]
    Malformed(String),

    /// Type tag is syntactically invalid.
    #[error("Invalid type tag: {0:?}")]
    InvalidTypeTag(String),

    /// Raw key could not be parsed for its declared kind.
    #[error("Invalid {kind} key: {value:?}")]
    InvalidKey {
        /// Declared key kind.
        kind: &'static str,
        /// Offending value.
        value: String,
    },

    /// Type tag is well-formed but no entity type is registered under it.
    #[error("Type {0} is not registered")]
    UnregisteredType(String),

    /// ID names a different type than the field accepts.
    #[error("Expected a {expected} ID, got a {found} ID")]
    WrongType {
        /// Type tag accepted by the field.
        expected: &'static str,
        /// Type tag carried by the ID.
        found: String,
    },
}

// =============================================================================
// Cursor Errors
// =============================================================================

/// A cursor could not be decoded or does not fit the active ordering.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CursorError {
    /// Input is longer than any cursor the codec produces.
    #[error("Cursor too long: maximum {max} characters allowed")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },

    /// Input is not valid base64url.
    #[error("Cursor is not valid base64url: {0}")]
    Encoding(String),

    /// Decoded payload is not a cursor document.
    #[error("Malformed cursor payload: {0}")]
    Malformed(String),

    /// Cursor was issued under a different ordering.
    #[error("Cursor was issued for ordering {found}, but the connection is ordered by {expected}")]
    OrderMismatch {
        /// Fingerprint of the active ordering.
        expected: String,
        /// Fingerprint stored in the cursor.
        found: String,
    },

    /// Cursor carries the wrong number of position values.
    #[error("Cursor has {found} position values, expected {expected}")]
    ArityMismatch {
        /// Number of sort keys of the active ordering.
        expected: usize,
        /// Number of values in the cursor.
        found: usize,
    },

    /// A position value has the wrong type for its column.
    #[error("Cursor value for {column} is not a {expected}")]
    KindMismatch {
        /// Sort column.
        column: String,
        /// Expected value kind.
        expected: &'static str,
    },
}

// =============================================================================
// Registry Errors
// =============================================================================

/// Node registry errors.
///
/// Registration errors are startup-time misconfiguration and are fatal.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// A loader is already registered for this type tag.
    #[error("Type {0} is already registered")]
    DuplicateRegistration(String),

    /// Type tag cannot be embedded in a global ID.
    #[error("Invalid type tag: {0:?}")]
    InvalidTypeTag(String),

    /// No loader is registered for this type tag.
    #[error("No loader registered for type {0}")]
    NotFound(String),
}

// =============================================================================
// Pagination Errors
// =============================================================================

/// Client misuse of connection arguments.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PaginationError {
    /// `first` and `last` were both supplied.
    #[error("Passing both `first` and `last` to paginate a connection is not supported")]
    ConflictingArguments,

    /// An argument is out of range.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// `after` or `before` could not be used.
    #[error("Invalid cursor: {0}")]
    InvalidCursor(#[from] CursorError),
}

// =============================================================================
// Resolve Errors
// =============================================================================

/// Failures of single-node resolution.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The ID could not be decoded.
    #[error("Invalid ID: {0}")]
    InvalidId(#[from] DecodeError),

    /// The ID names a type without a registered loader.
    #[error("Unknown node type: {0}")]
    UnknownType(String),

    /// The ID carries a key of the wrong kind for its type.
    #[error("Invalid ID: {type_tag} keys are {expected}, got {found}")]
    KeyKindMismatch {
        /// Type tag of the ID.
        type_tag: String,
        /// Key kind the type is registered with.
        expected: &'static str,
        /// Key kind carried by the ID.
        found: &'static str,
    },

    /// Loading the entity failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}

// =============================================================================
// Storage Errors
// =============================================================================

/// Database and repository errors.
///
/// These errors originate from storage operations like queries,
/// transactions, and data serialization.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StorageError {
    /// Failed to establish database connection.
    #[error("Database connection error: {0}")]
    ConnectionError(String),

    /// SQL query execution failed.
    #[error("Query execution error: {0}")]
    QueryError(String),

    /// Database migration failed.
    #[error("Migration error: {0}")]
    MigrationError(String),

    /// Transaction begin/commit/rollback failed.
    #[error("Transaction error: {0}")]
    TransactionError(String),

    /// Data serialization/deserialization failed.
    #[error("Serialization error: {0}")]
    SerializationError(String),
}

// =============================================================================
// Domain Errors
// =============================================================================

/// Top-level error for API operations.
///
/// This is the error type surfaced to the GraphQL layer. Each variant maps
/// to a stable machine-readable [`code`](DomainError::code).
#[derive(Debug, Error)]
pub enum DomainError {
    /// Global ID decoding failed.
    #[error(transparent)]
    Id(#[from] DecodeError),

    /// Registry lookup or registration failed.
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Pagination arguments were rejected.
    #[error(transparent)]
    Pagination(#[from] PaginationError),

    /// Node resolution failed.
    #[error(transparent)]
    Resolve(#[from] ResolveError),

    /// Storage operation failed.
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Generic input validation error.
    #[error("Validation error: {0}")]
    Validation(String),
}

impl From<CursorError> for DomainError {
    fn from(err: CursorError) -> Self {
        DomainError::Pagination(PaginationError::InvalidCursor(err))
    }
}

impl DomainError {
    /// Stable error code reported to API clients.
    pub fn code(&self) -> &'static str {
        match self {
            DomainError::Id(DecodeError::UnregisteredType(_)) => "UNKNOWN_TYPE",
            DomainError::Id(_) => "INVALID_ID",
            DomainError::Registry(RegistryError::NotFound(_)) => "UNKNOWN_TYPE",
            DomainError::Registry(_) => "REGISTRY",
            DomainError::Pagination(PaginationError::ConflictingArguments) => {
                "CONFLICTING_ARGUMENTS"
            }
            DomainError::Pagination(PaginationError::InvalidArgument(_)) => "INVALID_ARGUMENT",
            DomainError::Pagination(PaginationError::InvalidCursor(_)) => "INVALID_CURSOR",
            DomainError::Resolve(ResolveError::InvalidId(_))
            | DomainError::Resolve(ResolveError::KeyKindMismatch { .. }) => "INVALID_ID",
            DomainError::Resolve(ResolveError::UnknownType(_)) => "UNKNOWN_TYPE",
            DomainError::Resolve(ResolveError::Storage(_)) | DomainError::Storage(_) => "STORAGE",
            DomainError::Validation(_) => "VALIDATION",
        }
    }
}

// =============================================================================
// Result Type Aliases
// =============================================================================

/// Result type for API operations.
pub type DomainResult<T> = Result<T, DomainError>;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Result type for node resolution.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Result type for pagination argument handling.
pub type PaginationResult<T> = Result<T, PaginationError>;
