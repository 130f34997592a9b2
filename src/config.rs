//! Configuration for watch sessions.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ChangefeedError, Result};

/// Configuration for a [`Watcher`](crate::Watcher), immutable for the life
/// of one watch session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatcherConfig {
    /// Polling period.
    pub interval: Duration,
    /// Rewind window applied after the high-water mark advances, sized to
    /// exceed the store's maximum commit-visibility skew. Must be strictly
    /// less than `interval`, otherwise each poll's query range perpetually
    /// overlaps the entire previous range and neither the query cost nor
    /// the de-duplication ledger ever shrinks.
    pub txn_window: Duration,
    /// Capacity of the bounded event channel handed to the consumer.
    pub channel_capacity: usize,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            txn_window: Duration::from_secs(5),
            channel_capacity: 128,
        }
    }
}

impl WatcherConfig {
    /// Validate configuration.
    pub fn validate(&self) -> Result<()> {
        if self.interval.is_zero() {
            return Err(ChangefeedError::InvalidConfig {
                field: "interval".to_string(),
                reason: "Polling interval must be non-zero".to_string(),
            });
        }

        if self.txn_window >= self.interval {
            return Err(ChangefeedError::InvalidConfig {
                field: "txn_window".to_string(),
                reason: format!(
                    "Rewind window ({:?}) must be strictly less than the polling interval ({:?})",
                    self.txn_window, self.interval
                ),
            });
        }

        if self.channel_capacity == 0 {
            return Err(ChangefeedError::InvalidConfig {
                field: "channel_capacity".to_string(),
                reason: "Event channel capacity must be non-zero".to_string(),
            });
        }

        Ok(())
    }
}
