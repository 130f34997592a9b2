//! The capability contract the watcher polls, plus an in-memory adapter.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::Result;
use crate::record::ChangeRecord;

/// The two read-only queries a store must answer to be watchable.
///
/// Implementations adapt a concrete store (a SQL table with
/// `created_at` / `updated_at` / `deleted_at` columns, a KV namespace with
/// versioned writes) to the watcher. The watcher issues these queries with
/// deliberately overlapping ranges, so both must be idempotent reads; it
/// never writes, locks, or otherwise coordinates with the store.
#[async_trait]
pub trait ChangeSource: Send + Sync {
    /// Payload type carried by this source's records.
    type Resource: Send + 'static;

    /// Current maximum change timestamp across the watched collection.
    ///
    /// Called once per watch session, to seed the watermark.
    /// Implementations over an empty collection typically return the
    /// current time.
    async fn head(&self) -> Result<DateTime<Utc>>;

    /// All records with `updated_at >= since`, in the source's order.
    ///
    /// The boundary is inclusive.
    async fn updates(&self, since: DateTime<Utc>) -> Result<Vec<ChangeRecord<Self::Resource>>>;
}

#[async_trait]
impl<S: ChangeSource + ?Sized> ChangeSource for std::sync::Arc<S> {
    type Resource = S::Resource;

    async fn head(&self) -> Result<DateTime<Utc>> {
        (**self).head().await
    }

    async fn updates(&self, since: DateTime<Utc>) -> Result<Vec<ChangeRecord<Self::Resource>>> {
        (**self).updates(since).await
    }
}

/// In-memory [`ChangeSource`] backed by a row table.
///
/// A reference adapter: one row per entity id, returned in insertion order.
/// Deleting tombstones the row rather than removing it, so deletions remain
/// observable to pollers the way a soft-deleting store keeps them.
pub struct MemorySource<R> {
    rows: RwLock<Vec<ChangeRecord<R>>>,
}

impl<R: Clone + Send + Sync + 'static> MemorySource<R> {
    /// Creates an empty source.
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }

    /// Inserts or replaces a row with explicit change-tracking columns.
    pub async fn push(&self, record: ChangeRecord<R>) {
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => *existing = record,
            None => rows.push(record),
        }
    }

    /// Inserts a new entity or updates an existing one, stamping the
    /// change-tracking columns with the current time.
    pub async fn upsert(&self, id: impl Into<String>, resource: R) {
        let id = id.into();
        let now = Utc::now();
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.updated_at = now;
                row.deleted_at = None;
                row.resource = resource;
            }
            None => rows.push(ChangeRecord::new(id, now, now, resource)),
        }
    }

    /// Tombstones an entity. Returns `false` if the id is unknown.
    pub async fn remove(&self, id: &str) -> bool {
        let now = Utc::now();
        let mut rows = self.rows.write().await;
        match rows.iter_mut().find(|r| r.id == id) {
            Some(row) => {
                row.updated_at = now;
                row.deleted_at = Some(now);
                true
            }
            None => false,
        }
    }

    /// Snapshot of the current table, tombstones included.
    pub async fn rows(&self) -> Vec<ChangeRecord<R>> {
        self.rows.read().await.clone()
    }
}

impl<R: Clone + Send + Sync + 'static> Default for MemorySource<R> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<R: Clone + Send + Sync + 'static> ChangeSource for MemorySource<R> {
    type Resource = R;

    async fn head(&self) -> Result<DateTime<Utc>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .map(|r| r.updated_at)
            .max()
            .unwrap_or_else(Utc::now))
    }

    async fn updates(&self, since: DateTime<Utc>) -> Result<Vec<ChangeRecord<R>>> {
        let rows = self.rows.read().await;
        Ok(rows
            .iter()
            .filter(|r| r.updated_at >= since)
            .cloned()
            .collect())
    }
}
