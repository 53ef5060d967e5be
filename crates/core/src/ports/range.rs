//! Port trait for ordered range scans.
//!
//! The paginator only needs two things from storage: how many rows match a
//! filter, and a bounded slice of them in a given order. Both calls made for
//! one connection must observe the same data; adapters typically implement
//! this trait on a read snapshot (a repeatable-read transaction, or a cloned
//! in-memory table).

use async_trait::async_trait;

use crate::cursor::Position;
use crate::error::StorageResult;

use super::filter::Filter;
use super::pagination::{OrderDirection, OrderSpec, ScanDirection};

/// One bounded, ordered slice of a filtered row set.
#[derive(Debug, Clone)]
pub struct RangeScan<'a> {
    /// Declared ordering of the connection.
    pub order: &'a OrderSpec,
    /// Forward scans return rows in declared order; backward scans in
    /// reversed order, starting from the back.
    pub direction: ScanDirection,
    /// Only rows strictly after this position in declared order.
    pub after: Option<&'a Position>,
    /// Only rows strictly before this position in declared order.
    pub before: Option<&'a Position>,
    /// Maximum number of rows to return.
    pub limit: usize,
}

impl RangeScan<'_> {
    /// Direction rows are returned in.
    pub fn effective_direction(&self) -> OrderDirection {
        match self.direction {
            ScanDirection::Forward => self.order.direction(),
            ScanDirection::Backward => self.order.direction().reversed(),
        }
    }
}

/// Ordered, filterable row source for one entity type.
#[async_trait]
pub trait RangeSource<T>: Send + Sync {
    /// Number of rows matching `filter`, ignoring any window.
    async fn count(&self, filter: &Filter) -> StorageResult<i64>;

    /// Rows matching `filter` and the scan bounds, in scan order.
    async fn scan(&self, filter: &Filter, scan: &RangeScan<'_>) -> StorageResult<Vec<T>>;
}
