//! Time-indexed log store
//!
//! Keeps one ordered sequence of entries per service, sorted by
//! `(timestamp, message)`. All operations go through a single lock over the
//! whole map, so readers never observe a half-inserted or half-purged state.

pub mod sweep;

pub use sweep::{SweepConfig, SweepHandle};

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use thiserror::Error;

/// Errors surfaced by the store
///
/// Neither variant is expected under normal operation; they indicate an
/// internal fault such as allocation failure or a poisoned lock.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Fault while inserting or purging entries
    #[error("storage error: {0}")]
    Storage(String),

    /// Fault while reading entries
    #[error("query error: {0}")]
    Query(String),
}

/// Result type for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// A single stored log line
///
/// Field order matters: the derived `Ord` compares `timestamp` first and
/// breaks ties on `message` bytes, which is the store's sort order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct Entry {
    /// When the message was logged
    pub timestamp: DateTime<Utc>,
    /// Message body
    pub message: String,
}

impl Entry {
    /// Create a new entry
    pub fn new(timestamp: DateTime<Utc>, message: impl Into<String>) -> Self {
        Self {
            timestamp,
            message: message.into(),
        }
    }
}

/// In-memory log store keyed by service name
#[derive(Debug, Default)]
pub struct LogStore {
    services: Mutex<HashMap<String, Vec<Entry>>>,
}

impl LogStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<String, Vec<Entry>>>, String> {
        self.services
            .lock()
            .map_err(|_| "log store lock poisoned".to_string())
    }

    /// Insert an entry for `service`, keeping the sequence sorted
    ///
    /// Equal `(timestamp, message)` pairs are kept as separate entries; the
    /// new one lands after any existing equal entries.
    pub fn insert(
        &self,
        service: &str,
        timestamp: DateTime<Utc>,
        message: impl Into<String>,
    ) -> StoreResult<()> {
        let entry = Entry::new(timestamp, message);
        let mut services = self.lock().map_err(StoreError::Storage)?;

        let alloc_err = |e: std::collections::TryReserveError| StoreError::Storage(e.to_string());

        if let Some(entries) = services.get_mut(service) {
            entries.try_reserve(1).map_err(alloc_err)?;
            let pos = entries.partition_point(|e| *e <= entry);
            entries.insert(pos, entry);
            return Ok(());
        }

        // New service: the key only appears once its sequence holds the entry
        let mut entries = Vec::new();
        entries.try_reserve(1).map_err(alloc_err)?;
        entries.push(entry);
        services.try_reserve(1).map_err(alloc_err)?;
        services.insert(service.to_string(), entries);
        Ok(())
    }

    /// Return every entry for `service` with `start <= timestamp <= end`
    ///
    /// Unknown services and inverted ranges yield an empty result.
    pub fn range_query(
        &self,
        service: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> StoreResult<Vec<Entry>> {
        if start > end {
            return Ok(Vec::new());
        }

        let services = self.lock().map_err(StoreError::Query)?;
        let Some(entries) = services.get(service) else {
            return Ok(Vec::new());
        };

        // Lower key is (start, ""), upper key is (end, +inf): comparing on the
        // timestamp alone gives exactly those bounds for any message content.
        let lo = entries.partition_point(|e| e.timestamp < start);
        let hi = entries.partition_point(|e| e.timestamp <= end);

        Ok(entries[lo..hi].to_vec())
    }

    /// Drop every entry older than `now - retention` across all services
    ///
    /// Entries exactly at the threshold are kept. Returns the number of
    /// entries removed.
    pub fn purge(&self, now: DateTime<Utc>, retention: Duration) -> StoreResult<usize> {
        let threshold = now
            .checked_sub_signed(retention)
            .unwrap_or(DateTime::<Utc>::MIN_UTC);

        let mut services = self.lock().map_err(StoreError::Storage)?;
        let mut removed = 0;

        for entries in services.values_mut() {
            let cutoff = entries.partition_point(|e| e.timestamp < threshold);
            if cutoff > 0 {
                entries.drain(..cutoff);
                removed += cutoff;
            }
        }
        services.retain(|_, entries| !entries.is_empty());

        Ok(removed)
    }

    /// Services that currently hold at least one entry, sorted by name
    pub fn services(&self) -> StoreResult<Vec<String>> {
        let services = self.lock().map_err(StoreError::Query)?;
        let mut names: Vec<String> = services.keys().cloned().collect();
        names.sort();
        Ok(names)
    }

    /// Number of entries stored for `service`
    pub fn len(&self, service: &str) -> StoreResult<usize> {
        let services = self.lock().map_err(StoreError::Query)?;
        Ok(services.get(service).map_or(0, Vec::len))
    }

    /// Number of entries across all services
    pub fn total_len(&self) -> StoreResult<usize> {
        let services = self.lock().map_err(StoreError::Query)?;
        Ok(services.values().map(Vec::len).sum())
    }

    /// Check if the store holds no entries at all
    pub fn is_empty(&self) -> StoreResult<bool> {
        Ok(self.total_len()? == 0)
    }
}
