//! Polled change records.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::event::ChangeAction;

/// One polled row: the change-tracking columns plus the opaque resource
/// payload they describe.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeRecord<R> {
    /// Stable identity of the underlying entity, unique within the source's
    /// namespace.
    pub id: String,
    /// When the entity was created.
    pub created_at: DateTime<Utc>,
    /// When the entity last changed. The source guarantees
    /// `updated_at >= created_at`; the watcher only compares values.
    pub updated_at: DateTime<Utc>,
    /// Present iff the entity is tombstoned.
    pub deleted_at: Option<DateTime<Utc>>,
    /// Opaque payload. Forwarded to the consumer, never inspected.
    pub resource: R,
}

impl<R> ChangeRecord<R> {
    /// Creates a live (non-deleted) record.
    pub fn new(
        id: impl Into<String>,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
        resource: R,
    ) -> Self {
        Self {
            id: id.into(),
            created_at,
            updated_at,
            deleted_at: None,
            resource,
        }
    }

    /// Marks the record as tombstoned.
    pub fn with_deleted_at(mut self, deleted_at: DateTime<Utc>) -> Self {
        self.deleted_at = Some(deleted_at);
        self
    }

    /// Classifies the change this row represents.
    ///
    /// A tombstone always classifies as [`ChangeAction::Delete`], even when
    /// `created_at == updated_at`.
    pub fn action(&self) -> ChangeAction {
        if self.deleted_at.is_some() {
            ChangeAction::Delete
        } else if self.created_at == self.updated_at {
            ChangeAction::Create
        } else {
            ChangeAction::Update
        }
    }
}
