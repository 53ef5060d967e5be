//! Generic in-memory table and its snapshot range source.

use std::collections::BTreeMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use waypoint_core::cursor::Position;
use waypoint_core::error::{StorageError, StorageResult};
use waypoint_core::models::{Record, ValueKind};
use waypoint_core::ports::{Filter, OrderDirection, RangeScan, RangeSource};

/// Rows of one entity type, keyed by primary key.
pub struct MemoryTable<K, T> {
    name: &'static str,
    columns: &'static [(&'static str, ValueKind)],
    rows: RwLock<BTreeMap<K, T>>,
}

impl<K, T> MemoryTable<K, T>
where
    K: Ord + Clone + Send + Sync,
    T: Record + Clone + Send + Sync,
{
    pub fn new(name: &'static str, columns: &'static [(&'static str, ValueKind)]) -> Self {
        Self {
            name,
            columns,
            rows: RwLock::new(BTreeMap::new()),
        }
    }

    pub async fn insert(&self, key: K, row: T) {
        self.rows.write().await.insert(key, row);
    }

    pub async fn get(&self, key: &K) -> Option<T> {
        self.rows.read().await.get(key).cloned()
    }

    /// Rows for `keys`, in order, with `None` for missing keys.
    pub async fn get_many(&self, keys: &[K]) -> Vec<Option<T>> {
        let rows = self.rows.read().await;
        keys.iter().map(|k| rows.get(k).cloned()).collect()
    }

    pub async fn remove(&self, key: &K) -> bool {
        self.rows.write().await.remove(key).is_some()
    }

    pub async fn clear(&self) -> usize {
        let mut rows = self.rows.write().await;
        let removed = rows.len();
        rows.clear();
        removed
    }

    /// Copy of the table taken under the read lock.
    pub async fn snapshot(&self) -> MemorySource<T> {
        let rows = self.rows.read().await;
        MemorySource {
            name: self.name,
            columns: self.columns,
            rows: rows.values().cloned().collect(),
        }
    }
}

/// Immutable copy of a table, serving range scans.
pub struct MemorySource<T> {
    name: &'static str,
    columns: &'static [(&'static str, ValueKind)],
    rows: Vec<T>,
}

impl<T: Record> MemorySource<T> {
    fn check_columns<'c>(&self, columns: impl IntoIterator<Item = &'c str>) -> StorageResult<()> {
        for column in columns {
            if !self.columns.iter().any(|(name, _)| *name == column) {
                return Err(StorageError::QueryError(format!(
                    "unknown column {}.{}",
                    self.name, column
                )));
            }
        }
        Ok(())
    }

    fn matching<'a>(&'a self, filter: &'a Filter) -> impl Iterator<Item = &'a T> + 'a {
        self.rows.iter().filter(move |row| filter.matches(*row))
    }
}

#[async_trait]
impl<T> RangeSource<T> for MemorySource<T>
where
    T: Record + Clone + Send + Sync,
{
    async fn count(&self, filter: &Filter) -> StorageResult<i64> {
        self.check_columns(filter.columns())?;
        Ok(self.matching(filter).count() as i64)
    }

    async fn scan(&self, filter: &Filter, scan: &RangeScan<'_>) -> StorageResult<Vec<T>> {
        self.check_columns(filter.columns())?;
        self.check_columns(scan.order.keys().iter().map(|k| k.column))?;

        let order = scan.order;
        let mut rows: Vec<(Position, &T)> = Vec::new();
        for row in self.matching(filter) {
            rows.push((order.position_of(row)?, row));
        }

        // Bounds are expressed in the declared order.
        let ascending = order.direction() == OrderDirection::Asc;
        rows.retain(|(position, _)| {
            let after = scan
                .after
                .map_or(true, |a| if ascending { position > a } else { position < a });
            let before = scan
                .before
                .map_or(true, |b| if ascending { position < b } else { position > b });
            after && before
        });

        rows.sort_by(|(a, _), (b, _)| a.cmp(b));
        if scan.effective_direction() == OrderDirection::Desc {
            rows.reverse();
        }

        Ok(rows
            .into_iter()
            .take(scan.limit)
            .map(|(_, row)| row.clone())
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use waypoint_core::models::User;
    use waypoint_core::ports::{OrderSpec, ScanDirection, SortKey};

    fn user(id: i64, name: &str) -> User {
        User {
            id,
            name: name.into(),
            created_at: Utc::now(),
        }
    }

    // Test critique: count et scan d'un snapshot ignorent les écritures postérieures
    #[tokio::test]
    async fn test_snapshot_ignores_later_writes() {
        let table = MemoryTable::<i64, User>::new("users", User::COLUMNS);
        table.insert(1, user(1, "U1")).await;
        table.insert(2, user(2, "U2")).await;

        let snapshot = table.snapshot().await;
        table.insert(3, user(3, "U3")).await;
        table.remove(&1).await;

        let order = OrderSpec::by_key(SortKey::new("id", ValueKind::Int), OrderDirection::Asc);
        let scan = RangeScan {
            order: &order,
            direction: ScanDirection::Forward,
            after: None,
            before: None,
            limit: 10,
        };
        let count = RangeSource::<User>::count(&snapshot, &Filter::All)
            .await
            .unwrap();
        let rows = RangeSource::<User>::scan(&snapshot, &Filter::All, &scan)
            .await
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(rows.iter().map(|u| u.id).collect::<Vec<_>>(), vec![1, 2]);

        let fresh = table.snapshot().await;
        let rows = RangeSource::<User>::scan(&fresh, &Filter::All, &scan)
            .await
            .unwrap();
        assert_eq!(rows.iter().map(|u| u.id).collect::<Vec<_>>(), vec![2, 3]);
    }
}
