//! Sensor Log Storage
//!
//! Persists one [`EnrichedRecord`] per processed message behind the
//! [`RecordStore`] trait so backends can be swapped without touching
//! pipeline code:
//! - [`SledRecordStore`]: durable embedded database (default)
//! - [`InMemoryRecordStore`]: tests and `--no-persist` runs

mod export;
mod memory;
mod records;

pub use export::{export_csv, CSV_HEADER};
pub use memory::InMemoryRecordStore;
pub use records::SledRecordStore;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::types::{EnrichedRecord, RiskVerdict};

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("database error: {0}")]
    Database(#[from] sled::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("CSV export error: {0}")]
    Csv(#[from] csv::Error),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("storage lock poisoned")]
    Poisoned,
}

/// A persisted record with its row id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub id: u64,
    #[serde(flatten)]
    pub record: EnrichedRecord,
}

/// Share of records per merged status.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RiskStatistic {
    pub status: RiskVerdict,
    pub count: usize,
    /// Percentage of all records, two decimals
    pub percentage: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StoreInfo {
    pub backend: &'static str,
    pub total_records: usize,
    #[serde(serialize_with = "serialize_optional_timestamp")]
    pub first_timestamp: Option<NaiveDateTime>,
    #[serde(serialize_with = "serialize_optional_timestamp")]
    pub last_timestamp: Option<NaiveDateTime>,
    pub size_bytes: u64,
}

impl StoreInfo {
    pub fn size_mb(&self) -> f64 {
        (self.size_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0
    }
}

fn serialize_optional_timestamp<S: serde::Serializer>(
    ts: &Option<NaiveDateTime>,
    s: S,
) -> Result<S::Ok, S::Error> {
    match ts {
        Some(ts) => s.serialize_str(&crate::types::format_timestamp(ts)),
        None => s.serialize_none(),
    }
}

/// Persistence collaborator for enriched records.
///
/// Implementations must be thread-safe (Send + Sync) for shared access from
/// the processing loop and the read API.
pub trait RecordStore: Send + Sync {
    /// Store a record and return its row id.
    fn insert(&self, record: &EnrichedRecord) -> Result<u64, StorageError>;

    /// Newest `limit` records by timestamp, newest first.
    fn latest(&self, limit: usize) -> Result<Vec<StoredRecord>, StorageError>;

    /// Records with `start <= timestamp <= end`, oldest first.
    fn range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<StoredRecord>, StorageError>;

    /// Count and percentage per merged status, most frequent first.
    fn risk_statistics(&self) -> Result<Vec<RiskStatistic>, StorageError>;

    fn info(&self) -> Result<StoreInfo, StorageError>;

    /// Delete records with `timestamp < cutoff`; returns how many were removed.
    fn delete_older_than(&self, cutoff: NaiveDateTime) -> Result<usize, StorageError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}

/// Aggregate merged statuses into [`RiskStatistic`]s.
pub(crate) fn tally_statuses(statuses: impl IntoIterator<Item = RiskVerdict>) -> Vec<RiskStatistic> {
    let mut counts = [0usize; 3];
    for status in statuses {
        counts[status as usize] += 1;
    }
    let total: usize = counts.iter().sum();
    let mut stats: Vec<RiskStatistic> = [RiskVerdict::Safe, RiskVerdict::Warning, RiskVerdict::Danger]
        .into_iter()
        .filter(|v| counts[*v as usize] > 0)
        .map(|status| {
            let count = counts[status as usize];
            let percentage = (count as f64 * 100.0 / total as f64 * 100.0).round() / 100.0;
            RiskStatistic {
                status,
                count,
                percentage,
            }
        })
        .collect();
    stats.sort_by(|a, b| b.count.cmp(&a.count).then(b.status.cmp(&a.status)));
    stats
}
