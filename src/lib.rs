//! Changefeed - polling-based change data capture for query-only stores.
//!
//! Many data stores expose no push-based change notification, only a query
//! interface (e.g. tables with `created_at` / `updated_at` / `deleted_at`
//! columns). Changefeed emulates a live stream on top of two queries (the
//! current maximum change timestamp, and the records changed since a given
//! point) while tolerating write visibility that lags wall-clock ordering
//! and delivering each logical change at most once per `(id, updated_at)`
//! pair.
//!
//! # Features
//!
//! - **Typed events**: polled rows are classified into Create / Update /
//!   Delete from their change-tracking columns.
//! - **Overlap absorption**: after the high-water mark advances, the next
//!   query rewinds by a configurable window so commits that became visible
//!   late are still observed; a per-entity ledger suppresses the duplicates
//!   the overlap would otherwise produce.
//! - **Backpressure, not loss**: events flow through a bounded channel; a
//!   slow consumer delays polling instead of dropping events.
//! - **Fail-fast start**: if the seeding head query fails, no background
//!   task is ever spawned.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │  Source adapter: ChangeSource (head + updates queries)       │
//! ├──────────────────────────────────────────────────────────────┤
//! │  Watcher poll loop: watermark · dedup ledger · classify      │
//! ├──────────────────────────────────────────────────────────────┤
//! │  EventStream: bounded channel of typed ChangeEvents          │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Quick Start
//!
//! ```no_run
//! use std::time::Duration;
//! use changefeed::{MemorySource, ShutdownSignal, Watcher, WatcherConfig};
//!
//! #[tokio::main]
//! async fn main() -> changefeed::Result<()> {
//!     let source = MemorySource::<String>::new();
//!     let config = WatcherConfig {
//!         interval: Duration::from_secs(10),
//!         txn_window: Duration::from_secs(2),
//!         ..Default::default()
//!     };
//!
//!     let watcher = Watcher::new(config, source)?;
//!     let shutdown = ShutdownSignal::new();
//!     let mut events = watcher.watch(shutdown.clone()).await?;
//!
//!     while let Some(event) = events.recv().await {
//!         println!("{} {}", event.action, event.resource);
//!     }
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod event;
pub mod record;
pub mod shutdown;
pub mod source;
pub mod watcher;

pub use config::WatcherConfig;
pub use error::{ChangefeedError, Result};
pub use event::{ChangeAction, ChangeEvent, EventStream};
pub use record::ChangeRecord;
pub use shutdown::ShutdownSignal;
pub use source::{ChangeSource, MemorySource};
pub use watcher::{Watcher, WatcherBuilder, WatcherStatsSnapshot};
