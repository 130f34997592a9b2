//! The watcher: a pull-based change query turned into a push-based,
//! de-duplicated event stream.
//!
//! [`Watcher::watch`] seeds a watermark from the source's head timestamp,
//! then drives a single background task that periodically queries for
//! records changed at-or-after the watermark, classifies each into a
//! [`ChangeAction`](crate::ChangeAction), suppresses re-observations caused
//! by deliberate query overlap, and publishes the survivors to a bounded
//! channel.
//!
//! # Watermark and rewind
//!
//! Stores commonly make a transaction with an earlier change timestamp
//! visible *after* one with a later timestamp. To absorb that skew, whenever
//! the high-water mark advances the watermark is pulled back by the
//! configured rewind window, so the next query re-reads a trailing slice of
//! already-seen time; the de-duplication ledger keeps the overlap from
//! producing duplicate events. Once a tick observes no new high-water mark
//! the watermark moves up to the high-water mark itself and the re-scan
//! stops, bounding query cost.
//!
//! # Timer semantics
//!
//! The loop uses a fixed-period timer with skipped missed ticks: the first
//! poll fires one full interval after the session starts, and ticks that
//! elapse while the loop is blocked publishing to a full channel are
//! dropped, not queued. A slow consumer therefore delays polling
//! (backpressure) but never loses events.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::WatcherConfig;
use crate::error::{ChangefeedError, Result};
use crate::event::{ChangeEvent, EventStream};
use crate::shutdown::ShutdownSignal;
use crate::source::ChangeSource;

/// Polling-to-streaming adapter over a [`ChangeSource`].
pub struct Watcher<S> {
    config: WatcherConfig,
    /// `config.txn_window` converted for timestamp arithmetic.
    txn_window: chrono::Duration,
    source: Arc<S>,
    stats: Arc<WatcherStats>,
}

impl<S> Watcher<S>
where
    S: ChangeSource + 'static,
{
    /// Creates a watcher. Fails fast on invalid configuration.
    pub fn new(config: WatcherConfig, source: S) -> Result<Self> {
        config.validate()?;
        let txn_window = chrono::Duration::from_std(config.txn_window).map_err(|e| {
            ChangefeedError::InvalidConfig {
                field: "txn_window".to_string(),
                reason: e.to_string(),
            }
        })?;

        Ok(Self {
            config,
            txn_window,
            source: Arc::new(source),
            stats: Arc::new(WatcherStats::default()),
        })
    }

    /// Counters across this watcher's lifetime, covering all of its
    /// sessions.
    pub fn stats(&self) -> WatcherStatsSnapshot {
        self.stats.snapshot()
    }

    /// Starts a watch session.
    ///
    /// Queries the source's head timestamp first; on failure that error is
    /// returned directly and **no background task or channel exists**:
    /// nothing to leak, nothing to cancel. On success exactly one background
    /// task is spawned and the consumer half of the bounded event channel is
    /// returned.
    ///
    /// The session ends when `shutdown` is triggered, or when the returned
    /// stream is dropped and the task notices on its next send. Either way
    /// the channel is closed exactly once; events already buffered stay
    /// readable until the stream is drained.
    ///
    /// Each call is an independent session with fresh state: the watermark
    /// is re-seeded from `head` and the de-duplication ledger starts empty.
    pub async fn watch(&self, shutdown: ShutdownSignal) -> Result<EventStream<S::Resource>> {
        let start = self.source.head().await?;

        let (tx, rx) = mpsc::channel(self.config.channel_capacity);
        let poll_loop = PollLoop {
            source: Arc::clone(&self.source),
            stats: Arc::clone(&self.stats),
            interval: self.config.interval,
            txn_window: self.txn_window,
            tx,
            shutdown,
            session: PollSession::new(start),
        };

        info!(
            %start,
            interval = ?self.config.interval,
            txn_window = ?self.config.txn_window,
            "Starting watch session"
        );
        tokio::spawn(poll_loop.run());

        Ok(EventStream::new(rx))
    }
}

/// Fluent construction for [`Watcher`].
pub struct WatcherBuilder {
    config: WatcherConfig,
}

impl WatcherBuilder {
    pub fn new() -> Self {
        Self {
            config: WatcherConfig::default(),
        }
    }

    /// Sets the polling period.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.config.interval = interval;
        self
    }

    /// Sets the rewind window.
    pub fn txn_window(mut self, txn_window: Duration) -> Self {
        self.config.txn_window = txn_window;
        self
    }

    /// Sets the event channel capacity.
    pub fn channel_capacity(mut self, capacity: usize) -> Self {
        self.config.channel_capacity = capacity;
        self
    }

    /// Builds the watcher over the given source.
    pub fn build<S>(self, source: S) -> Result<Watcher<S>>
    where
        S: ChangeSource + 'static,
    {
        Watcher::new(self.config, source)
    }
}

impl Default for WatcherBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Session state. Confined to the poll task; nothing here is shared or
/// locked.
struct PollSession {
    /// Lower-bound watermark passed to the next updates query.
    start: DateTime<Utc>,
    /// Last delivered `updated_at` per entity id.
    ledger: HashMap<String, DateTime<Utc>>,
    /// Highest `updated_at` observed so far.
    most_recent: DateTime<Utc>,
    /// `most_recent` as of the previous tick.
    prev_most_recent: DateTime<Utc>,
}

impl PollSession {
    fn new(start: DateTime<Utc>) -> Self {
        Self {
            start,
            ledger: HashMap::new(),
            most_recent: start,
            // Minimum so the first tick's observation registers as an
            // advance and triggers the initial rewind.
            prev_most_recent: DateTime::<Utc>::MIN_UTC,
        }
    }
}

/// The background half of a watch session.
struct PollLoop<S: ChangeSource> {
    source: Arc<S>,
    stats: Arc<WatcherStats>,
    interval: Duration,
    txn_window: chrono::Duration,
    tx: mpsc::Sender<ChangeEvent<S::Resource>>,
    shutdown: ShutdownSignal,
    session: PollSession,
}

impl<S: ChangeSource> PollLoop<S> {
    async fn run(mut self) {
        let mut ticker =
            tokio::time::interval_at(tokio::time::Instant::now() + self.interval, self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    debug!("Watch session cancelled");
                    break;
                }
                _ = ticker.tick() => {}
            }

            if !self.poll_once().await {
                break;
            }
        }
        // Dropping `self.tx` here closes the stream. Buffered events remain
        // readable until the consumer drains them.
    }

    /// Runs one tick. Returns `false` when the consumer is gone.
    async fn poll_once(&mut self) -> bool {
        self.stats.polls.fetch_add(1, Ordering::Relaxed);

        let records = match self.source.updates(self.session.start).await {
            Ok(records) => records,
            Err(e) => {
                // Transient by contract: every piece of session state stays
                // untouched and the same range is retried on the next tick.
                // Never surfaced on the event channel.
                self.stats.poll_failures.fetch_add(1, Ordering::Relaxed);
                debug!(error = %e, start = %self.session.start, "Updates query failed, retrying next tick");
                return true;
            }
        };

        for record in records {
            self.stats.records_observed.fetch_add(1, Ordering::Relaxed);

            if self.session.ledger.get(&record.id) == Some(&record.updated_at) {
                // Re-observation inside the overlap window, not a new change.
                self.stats.records_deduped.fetch_add(1, Ordering::Relaxed);
                continue;
            }
            self.session
                .ledger
                .insert(record.id.clone(), record.updated_at);

            if record.updated_at > self.session.most_recent {
                self.session.most_recent = record.updated_at;
            }

            let action = record.action();
            if self
                .tx
                .send(ChangeEvent::new(action, record.resource))
                .await
                .is_err()
            {
                debug!("Event stream dropped, ending watch session");
                return false;
            }
            self.stats.events_emitted.fetch_add(1, Ordering::Relaxed);
        }

        if self.session.most_recent > self.session.prev_most_recent {
            // The high-water mark advanced: rewind so the next query
            // re-reads the trailing window and catches commits that became
            // visible after this tick's query ran.
            self.session.start = self.session.most_recent - self.txn_window;
        } else {
            // Caught up: stop re-scanning the window.
            self.session.start = self.session.most_recent;
        }
        self.session.prev_most_recent = self.session.most_recent;

        let start = self.session.start;
        self.session.ledger.retain(|_, delivered| *delivered >= start);
        self.stats
            .ledger_entries
            .store(self.session.ledger.len() as u64, Ordering::Relaxed);

        true
    }
}

/// Watcher counters, shared with the poll task.
#[derive(Default)]
struct WatcherStats {
    polls: AtomicU64,
    poll_failures: AtomicU64,
    records_observed: AtomicU64,
    records_deduped: AtomicU64,
    events_emitted: AtomicU64,
    ledger_entries: AtomicU64,
}

impl WatcherStats {
    fn snapshot(&self) -> WatcherStatsSnapshot {
        WatcherStatsSnapshot {
            polls: self.polls.load(Ordering::Relaxed),
            poll_failures: self.poll_failures.load(Ordering::Relaxed),
            records_observed: self.records_observed.load(Ordering::Relaxed),
            records_deduped: self.records_deduped.load(Ordering::Relaxed),
            events_emitted: self.events_emitted.load(Ordering::Relaxed),
            ledger_entries: self.ledger_entries.load(Ordering::Relaxed),
        }
    }
}

/// Point-in-time view of a watcher's counters.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct WatcherStatsSnapshot {
    /// Updates queries attempted.
    pub polls: u64,
    /// Updates queries that failed and were skipped.
    pub poll_failures: u64,
    /// Records returned by the source, duplicates included.
    pub records_observed: u64,
    /// Records suppressed by the de-duplication ledger.
    pub records_deduped: u64,
    /// Events published to the stream.
    pub events_emitted: u64,
    /// Ledger size after the most recent tick's garbage collection.
    pub ledger_entries: u64,
}
