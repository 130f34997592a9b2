//! Shared test harness: a scripted change source with deterministic
//! per-poll responses and recorded query arguments.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};

use changefeed::{ChangeRecord, ChangeSource, ChangefeedError, Result};

/// Test payload: the entity id plus the integer second of the change that
/// produced it, so emitted events identify their `(id, updated_at)` pair.
pub type Payload = (String, i64);

/// Integer "ticks" as timestamps, for deterministic scenarios.
pub fn ts(secs: i64) -> DateTime<Utc> {
    Utc.timestamp_opt(secs, 0).unwrap()
}

/// A live row with integer-second change columns.
pub fn row(id: &str, created: i64, updated: i64) -> ChangeRecord<Payload> {
    ChangeRecord::new(id, ts(created), ts(updated), (id.to_string(), updated))
}

/// A tombstoned row.
pub fn tombstone(id: &str, created: i64, updated: i64, deleted: i64) -> ChangeRecord<Payload> {
    row(id, created, updated).with_deleted_at(ts(deleted))
}

enum ScriptedPoll {
    Batch(Vec<ChangeRecord<Payload>>),
    Fail(String),
}

/// A [`ChangeSource`] that answers each successive updates query from a
/// script, records every `since` argument it is queried with, and counts
/// calls. Once the script is exhausted it answers with empty batches.
pub struct ScriptedSource {
    head: std::result::Result<DateTime<Utc>, String>,
    polls: Mutex<VecDeque<ScriptedPoll>>,
    since_args: Mutex<Vec<DateTime<Utc>>>,
    updates_calls: AtomicU64,
}

impl ScriptedSource {
    pub fn new(head: i64) -> Self {
        Self {
            head: Ok(ts(head)),
            polls: Mutex::new(VecDeque::new()),
            since_args: Mutex::new(Vec::new()),
            updates_calls: AtomicU64::new(0),
        }
    }

    pub fn failing_head(message: &str) -> Self {
        Self {
            head: Err(message.to_string()),
            polls: Mutex::new(VecDeque::new()),
            since_args: Mutex::new(Vec::new()),
            updates_calls: AtomicU64::new(0),
        }
    }

    /// Appends a batch the next unanswered poll will receive.
    pub fn enqueue(&self, batch: Vec<ChangeRecord<Payload>>) {
        self.polls.lock().unwrap().push_back(ScriptedPoll::Batch(batch));
    }

    /// Appends a failing poll.
    pub fn enqueue_failure(&self, message: &str) {
        self.polls
            .lock()
            .unwrap()
            .push_back(ScriptedPoll::Fail(message.to_string()));
    }

    pub fn updates_calls(&self) -> u64 {
        self.updates_calls.load(Ordering::SeqCst)
    }

    /// Every `since` argument observed so far, in call order.
    pub fn since_args(&self) -> Vec<DateTime<Utc>> {
        self.since_args.lock().unwrap().clone()
    }
}

#[async_trait]
impl ChangeSource for ScriptedSource {
    type Resource = Payload;

    async fn head(&self) -> Result<DateTime<Utc>> {
        self.head
            .clone()
            .map_err(ChangefeedError::Source)
    }

    async fn updates(&self, since: DateTime<Utc>) -> Result<Vec<ChangeRecord<Payload>>> {
        self.updates_calls.fetch_add(1, Ordering::SeqCst);
        self.since_args.lock().unwrap().push(since);

        match self.polls.lock().unwrap().pop_front() {
            Some(ScriptedPoll::Batch(batch)) => Ok(batch),
            Some(ScriptedPoll::Fail(message)) => Err(ChangefeedError::Source(message)),
            None => Ok(Vec::new()),
        }
    }
}

/// Sleeps in virtual time until the source has answered at least `n`
/// updates queries.
pub async fn wait_for_polls(source: &ScriptedSource, n: u64) {
    while source.updates_calls() < n {
        tokio::time::sleep(std::time::Duration::from_millis(500)).await;
    }
}
