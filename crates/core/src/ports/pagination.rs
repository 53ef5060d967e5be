//! Pagination types for connection queries.
//!
//! These types implement Relay-style cursor pagination, commonly used
//! with GraphQL but also applicable to other APIs.

use tracing::debug;

use crate::cursor::{self, Position};
use crate::error::{CursorError, PaginationError, PaginationResult, StorageError, StorageResult};
use crate::models::{Record, ValueKind};

/// Opaque cursor for pagination.
///
/// The cursor value is produced by [`crate::cursor::encode`] and should be
/// treated as an opaque token by clients.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cursor {
    pub value: String,
}

impl From<String> for Cursor {
    fn from(value: String) -> Self {
        Self { value }
    }
}

/// Pagination arguments for connection queries, as supplied by the client.
///
/// Supports forward pagination (`first`/`after`) and backward
/// pagination (`last`/`before`).
#[derive(Debug, Clone, Default)]
pub struct Pagination {
    /// Number of items to fetch (forward pagination).
    pub first: Option<i32>,
    /// Cursor to start after (forward pagination).
    pub after: Option<Cursor>,
    /// Number of items to fetch (backward pagination).
    pub last: Option<i32>,
    /// Cursor to end before (backward pagination).
    pub before: Option<Cursor>,
}

/// Page size limits.
#[derive(Debug, Clone, Copy)]
pub struct PaginationConfig {
    /// Page size when neither `first` nor `last` is given.
    pub default_page_size: usize,
    /// Upper bound for `first`/`last`; larger values are clamped.
    pub max_page_size: usize,
}

impl Default for PaginationConfig {
    fn default() -> Self {
        Self {
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

/// Direction of a range scan relative to the declared ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScanDirection {
    /// Declared order, from the front.
    Forward,
    /// Reversed order, from the back.
    Backward,
}

/// Validated pagination window, ready to be executed by the paginator.
#[derive(Debug, Clone)]
pub struct PageWindow {
    pub order: OrderSpec,
    pub direction: ScanDirection,
    /// Number of edges to return.
    pub limit: usize,
    /// Only rows strictly after this position.
    pub after: Option<Position>,
    /// Only rows strictly before this position.
    pub before: Option<Position>,
}

impl Pagination {
    /// Forward pagination arguments.
    pub fn forward(first: Option<i32>, after: Option<Cursor>) -> Self {
        Self {
            first,
            after,
            ..Default::default()
        }
    }

    /// Backward pagination arguments.
    pub fn backward(last: Option<i32>, before: Option<Cursor>) -> Self {
        Self {
            last,
            before,
            ..Default::default()
        }
    }

    /// Validate the arguments against an ordering and resolve the window.
    ///
    /// - `first` together with `last` is rejected.
    /// - Negative counts are rejected; counts above the maximum are clamped.
    /// - Cursors must have been issued under `order`.
    pub fn resolve(
        &self,
        order: OrderSpec,
        config: &PaginationConfig,
    ) -> PaginationResult<PageWindow> {
        if self.first.is_some() && self.last.is_some() {
            return Err(PaginationError::ConflictingArguments);
        }
        for (name, value) in [("first", self.first), ("last", self.last)] {
            if let Some(n) = value.filter(|n| *n < 0) {
                return Err(PaginationError::InvalidArgument(format!(
                    "`{}` must be a non-negative integer, got {}",
                    name, n
                )));
            }
        }

        let after = self
            .after
            .as_ref()
            .map(|c| order.decode_cursor(c))
            .transpose()?;
        let before = self
            .before
            .as_ref()
            .map(|c| order.decode_cursor(c))
            .transpose()?;

        let direction = if self.last.is_some() {
            ScanDirection::Backward
        } else {
            ScanDirection::Forward
        };

        let requested = self
            .first
            .or(self.last)
            .map(|n| n as usize)
            .unwrap_or(config.default_page_size);
        let limit = requested.min(config.max_page_size);
        if limit < requested {
            debug!(requested, limit, "Page size clamped");
        }

        Ok(PageWindow {
            order,
            direction,
            limit,
            after,
            before,
        })
    }
}

/// Paginated result set with edges and page info.
///
/// This is the Relay connection pattern for cursor-based pagination.
#[derive(Debug, Clone)]
pub struct Connection<T> {
    /// List of edges (node + cursor pairs).
    pub edges: Vec<Edge<T>>,
    /// Information about the current page.
    pub page_info: PageInfo,
    /// Count of all items matching the filter, regardless of the window.
    pub total_count: i64,
}

impl<T> Connection<T> {
    /// Nodes of this page, in order.
    pub fn nodes(&self) -> impl Iterator<Item = &T> {
        self.edges.iter().map(|e| &e.node)
    }
}

/// A single item in a paginated result.
#[derive(Debug, Clone)]
pub struct Edge<T> {
    /// The actual item.
    pub node: T,
    /// Cursor for this item (used for pagination).
    pub cursor: Cursor,
}

/// Information about the current page in a paginated result.
#[derive(Debug, Clone, Default)]
pub struct PageInfo {
    /// Whether there are more items after this page.
    pub has_next_page: bool,
    /// Whether there are items before this page.
    pub has_previous_page: bool,
    /// Cursor of the first item in this page.
    pub start_cursor: Option<Cursor>,
    /// Cursor of the last item in this page.
    pub end_cursor: Option<Cursor>,
}

/// Ordering direction for sorted queries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OrderDirection {
    /// Ascending order (smallest first).
    #[default]
    Asc,
    /// Descending order (largest first).
    Desc,
}

impl OrderDirection {
    pub fn as_sql(&self) -> &'static str {
        match self {
            OrderDirection::Asc => "ASC",
            OrderDirection::Desc => "DESC",
        }
    }

    pub fn reversed(&self) -> Self {
        match self {
            OrderDirection::Asc => OrderDirection::Desc,
            OrderDirection::Desc => OrderDirection::Asc,
        }
    }
}

// =============================================================================
// Ordering
// =============================================================================

/// A column participating in an ordering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub column: &'static str,
    pub kind: ValueKind,
}

impl SortKey {
    pub const fn new(column: &'static str, kind: ValueKind) -> Self {
        Self { column, kind }
    }
}

/// Total ordering of a connection: one or more sort keys sharing a direction.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderSpec {
    keys: Vec<SortKey>,
    direction: OrderDirection,
}

impl OrderSpec {
    /// Order by a single unique key.
    pub fn by_key(key: SortKey, direction: OrderDirection) -> Self {
        Self {
            keys: vec![key],
            direction,
        }
    }

    /// Order by `field`, breaking ties with the unique `tiebreaker`.
    pub fn new(field: SortKey, tiebreaker: SortKey, direction: OrderDirection) -> Self {
        let keys = if field.column == tiebreaker.column {
            vec![field]
        } else {
            vec![field, tiebreaker]
        };
        Self { keys, direction }
    }

    pub fn keys(&self) -> &[SortKey] {
        &self.keys
    }

    pub fn direction(&self) -> OrderDirection {
        self.direction
    }

    /// Stable textual identity of this ordering, e.g. `name,id:ASC`.
    pub fn fingerprint(&self) -> String {
        let columns: Vec<&str> = self.keys.iter().map(|k| k.column).collect();
        format!("{}:{}", columns.join(","), self.direction.as_sql())
    }

    /// Position of `row` under this ordering.
    pub fn position_of<R: Record>(&self, row: &R) -> StorageResult<Position> {
        self.keys
            .iter()
            .map(|key| {
                row.field(key.column).ok_or_else(|| {
                    StorageError::SerializationError(format!(
                        "row has no sort column {}",
                        key.column
                    ))
                })
            })
            .collect::<StorageResult<Vec<_>>>()
            .map(Position)
    }

    /// Cursor of `row` under this ordering.
    pub fn cursor_of<R: Record>(&self, row: &R) -> StorageResult<Cursor> {
        Ok(cursor::encode(self, &self.position_of(row)?))
    }

    /// Decode a cursor and check that it was issued under this ordering.
    pub fn decode_cursor(&self, cursor: &Cursor) -> Result<Position, CursorError> {
        let (fingerprint, position) = cursor::decode(cursor)?;
        if fingerprint != self.fingerprint() {
            return Err(CursorError::OrderMismatch {
                expected: self.fingerprint(),
                found: fingerprint,
            });
        }
        if position.len() != self.keys.len() {
            return Err(CursorError::ArityMismatch {
                expected: self.keys.len(),
                found: position.len(),
            });
        }
        for (key, value) in self.keys.iter().zip(position.values()) {
            if value.kind() != key.kind {
                return Err(CursorError::KindMismatch {
                    column: key.column.to_string(),
                    expected: key.kind.as_str(),
                });
            }
        }
        Ok(position)
    }
}
