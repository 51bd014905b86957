//! Logging setup and edit counters.
//!
//! The library only emits `tracing` events; binaries call [`init_tracing`]
//! once to install a subscriber. [`EditStats`] counts applied and rejected
//! edits for a session.

use crate::config::LoggingConfig;
use crate::{Error, Result};

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// Install the global tracing subscriber.
///
/// `RUST_LOG` overrides the configured level when set.
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.level))
        .map_err(|e| Error::config_key(format!("invalid log filter: {}", e), "logging.level"))?;

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .with_writer(std::io::stderr);

    let installed = if config.json {
        builder.json().try_init()
    } else {
        builder.try_init()
    };

    installed.map_err(|e| Error::internal(format!("Failed to set logging subscriber: {}", e)))
}

/// Counters for edits applied in a session.
#[derive(Debug, Default)]
pub struct EditStats {
    applied: AtomicU64,
    rejected: AtomicU64,
    rejected_by_category: Mutex<BTreeMap<&'static str, u64>>,
}

impl EditStats {
    /// Create empty counters.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a successful edit.
    pub fn record_applied(&self) {
        self.applied.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected edit under the error's category.
    pub fn record_rejected(&self, error: &Error) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
        if let Ok(mut by_category) = self.rejected_by_category.lock() {
            *by_category.entry(error.category()).or_insert(0) += 1;
        }
    }

    /// Snapshot the counters.
    pub fn snapshot(&self) -> EditMetrics {
        let rejected_by_category = self
            .rejected_by_category
            .lock()
            .map(|m| m.iter().map(|(k, v)| (k.to_string(), *v)).collect())
            .unwrap_or_default();

        EditMetrics {
            applied: self.applied.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            rejected_by_category,
        }
    }
}

/// A point-in-time view of [`EditStats`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EditMetrics {
    /// Edits that produced a new document
    pub applied: u64,
    /// Edits that were refused
    pub rejected: u64,
    /// Refusals keyed by error category
    pub rejected_by_category: BTreeMap<String, u64>,
}

impl EditMetrics {
    /// Total edits attempted.
    pub fn total(&self) -> u64 {
        self.applied + self.rejected
    }
}
