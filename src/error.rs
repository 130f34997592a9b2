//! Error types for changefeed operations.
//!
//! This module provides a unified error type [`ChangefeedError`] for all
//! changefeed operations, along with a convenient [`Result`] type alias.
//!
//! # Error Categories
//!
//! - **Configuration**: invalid settings rejected when a watcher is built
//! - **Source**: a head or updates query against the watched store failed
//! - **Serialization**: JSON encoding/decoding of events
//!
//! # Example
//!
//! ```rust
//! use changefeed::error::{ChangefeedError, Result};
//!
//! fn query(table: &str) -> Result<()> {
//!     if table.is_empty() {
//!         return Err(ChangefeedError::Source("table name is empty".into()));
//!     }
//!     Ok(())
//! }
//!
//! fn handle_error(err: &ChangefeedError) {
//!     if err.is_retryable() {
//!         println!("Retrying on the next poll...");
//!     } else {
//!         println!("Fatal error: {}", err);
//!     }
//! }
//! ```

use std::io;
use thiserror::Error;

/// Main error type for changefeed operations.
#[derive(Error, Debug)]
pub enum ChangefeedError {
    /// Configuration rejected when the watcher was built.
    #[error("Invalid configuration: {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    /// The source failed to answer a head or updates query.
    #[error("Source query failed: {0}")]
    Source(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ChangefeedError {
    /// Check if error is retryable.
    ///
    /// Source query failures are exactly the class the poll loop retries on
    /// its next tick; everything else is fatal to the operation that raised
    /// it.
    pub fn is_retryable(&self) -> bool {
        matches!(self, ChangefeedError::Source(_))
    }
}

impl From<serde_json::Error> for ChangefeedError {
    fn from(e: serde_json::Error) -> Self {
        ChangefeedError::Serialization(e.to_string())
    }
}

/// Result type alias for changefeed operations.
pub type Result<T> = std::result::Result<T, ChangefeedError>;
