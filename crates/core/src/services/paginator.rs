//! Connection paginator - turns a validated window into a Relay page.
//!
//! Storage adapters call [`paginate`] with a [`RangeSource`] bound to a
//! read snapshot. The paginator counts the filtered set, fetches one look-ahead
//! row beyond the window to learn whether more rows remain, restores the
//! declared order for backward scans, and computes edge cursors.

use tracing::{debug, instrument};

use crate::error::{PaginationError, PaginationResult, StorageResult};
use crate::metrics::{record_connection_served, record_cursor_decode_error, ConnectionTimer};
use crate::models::{NodeType, Record};
use crate::ports::{
    Connection, Edge, Filter, OrderSpec, PageInfo, PageWindow, Pagination, PaginationConfig,
    RangeScan, RangeSource, ScanDirection,
};

// =============================================================================
// Paginator
// =============================================================================

/// Validates client pagination arguments against the configured limits.
#[derive(Debug, Clone, Copy, Default)]
pub struct Paginator {
    config: PaginationConfig,
}

impl Paginator {
    pub fn new(config: PaginationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &PaginationConfig {
        &self.config
    }

    /// Resolve client arguments into a window over `order`.
    pub fn window(&self, args: &Pagination, order: OrderSpec) -> PaginationResult<PageWindow> {
        args.resolve(order, &self.config).inspect_err(|e| {
            if matches!(e, PaginationError::InvalidCursor(_)) {
                record_cursor_decode_error();
            }
        })
    }
}

/// Materialize one page of `source`.
///
/// `total_count` counts every row matching `filter`, independently of the
/// window. Both page flags are derived from the look-ahead row and the cursors
/// supplied by the client, never from `total_count`.
#[instrument(skip_all, fields(node_type = T::TYPE_TAG, limit = window.limit, direction = ?window.direction))]
pub async fn paginate<T, S>(
    source: &S,
    filter: &Filter,
    window: &PageWindow,
) -> StorageResult<Connection<T>>
where
    T: Record + NodeType + Send,
    S: RangeSource<T> + ?Sized,
{
    let _timer = ConnectionTimer::new(T::TYPE_TAG);

    let total_count = source.count(filter).await?;

    let scan = RangeScan {
        order: &window.order,
        direction: window.direction,
        after: window.after.as_ref(),
        before: window.before.as_ref(),
        limit: window.limit + 1,
    };
    let mut rows = source.scan(filter, &scan).await?;

    let has_more = rows.len() > window.limit;
    rows.truncate(window.limit);
    if window.direction == ScanDirection::Backward {
        rows.reverse();
    }

    let edges = rows
        .into_iter()
        .map(|node| {
            let cursor = window.order.cursor_of(&node)?;
            Ok(Edge { node, cursor })
        })
        .collect::<StorageResult<Vec<_>>>()?;

    let (has_next_page, has_previous_page) = match window.direction {
        ScanDirection::Forward => (has_more, window.after.is_some()),
        ScanDirection::Backward => (window.before.is_some(), has_more),
    };

    let page_info = PageInfo {
        has_next_page,
        has_previous_page,
        start_cursor: edges.first().map(|e| e.cursor.clone()),
        end_cursor: edges.last().map(|e| e.cursor.clone()),
    };

    debug!(
        total_count,
        edges = edges.len(),
        has_next_page,
        has_previous_page,
        "Connection page built"
    );
    record_connection_served(T::TYPE_TAG);

    Ok(Connection {
        edges,
        page_info,
        total_count,
    })
}
