//! Typed change events and the stream handed to consumers.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

/// What happened to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Entity appeared for the first time.
    Create,
    /// Entity changed after creation.
    Update,
    /// Entity was tombstoned.
    Delete,
    /// Reserved: a watch-level failure surfaced on the stream. The poll loop
    /// never produces this today (source query failures are retried
    /// silently), but adapters layered on top of the stream may use it.
    Error,
}

impl std::fmt::Display for ChangeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ChangeAction::Create => write!(f, "create"),
            ChangeAction::Update => write!(f, "update"),
            ChangeAction::Delete => write!(f, "delete"),
            ChangeAction::Error => write!(f, "error"),
        }
    }
}

/// Emitted unit: the classification plus the untouched resource payload.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChangeEvent<R> {
    /// What happened.
    pub action: ChangeAction,
    /// The resource as returned by the source.
    pub resource: R,
}

impl<R> ChangeEvent<R> {
    /// Creates a new change event.
    pub fn new(action: ChangeAction, resource: R) -> Self {
        Self { action, resource }
    }
}

impl<R: Serialize> ChangeEvent<R> {
    /// Serializes to JSON.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }
}

impl<R: DeserializeOwned> ChangeEvent<R> {
    /// Deserializes from JSON.
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

/// Consumer half of a watch session.
///
/// Wraps the bounded event channel. [`recv`](EventStream::recv) returning
/// `None` means the session ended (cancellation) and every buffered event
/// has been drained; buffered events are never discarded on shutdown.
#[derive(Debug)]
pub struct EventStream<R> {
    receiver: mpsc::Receiver<ChangeEvent<R>>,
}

impl<R> EventStream<R> {
    pub(crate) fn new(receiver: mpsc::Receiver<ChangeEvent<R>>) -> Self {
        Self { receiver }
    }

    /// Receive the next event.
    pub async fn recv(&mut self) -> Option<ChangeEvent<R>> {
        self.receiver.recv().await
    }

    /// Try to receive an event without blocking.
    pub fn try_recv(&mut self) -> Option<ChangeEvent<R>> {
        self.receiver.try_recv().ok()
    }

    /// Unwrap the underlying channel receiver.
    pub fn into_inner(self) -> mpsc::Receiver<ChangeEvent<R>> {
        self.receiver
    }
}
