//! In-memory record store
//!
//! Thread-safe via `RwLock`. Not durable; data is lost on restart.
//! A bounded store evicts the oldest inserted records once full, so a
//! long-running `--no-persist` gateway holds a fixed window.

use chrono::NaiveDateTime;
use std::collections::VecDeque;
use std::sync::RwLock;
use tracing::debug;

use super::{tally_statuses, RecordStore, RiskStatistic, StorageError, StoreInfo, StoredRecord};
use crate::types::EnrichedRecord;

#[derive(Debug, Default)]
pub struct InMemoryRecordStore {
    /// Insertion order, oldest first
    records: RwLock<VecDeque<StoredRecord>>,
    next_id: RwLock<u64>,
    /// `None` keeps everything
    max_records: Option<usize>,
}

impl InMemoryRecordStore {
    /// Unbounded store (tests, short replays).
    pub fn new() -> Self {
        Self::default()
    }

    /// Store holding at most `max_records` records (clamped to at least one).
    pub fn bounded(max_records: usize) -> Self {
        Self {
            max_records: Some(max_records.max(1)),
            ..Self::default()
        }
    }

    pub const fn max_records(&self) -> Option<usize> {
        self.max_records
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, VecDeque<StoredRecord>>, StorageError> {
        self.records.read().map_err(|_| StorageError::Poisoned)
    }

    /// Records sorted by timestamp, ties by id.
    fn sorted(&self) -> Result<Vec<StoredRecord>, StorageError> {
        let mut records: Vec<StoredRecord> = self.read()?.iter().cloned().collect();
        records.sort_by(|a, b| {
            a.record
                .timestamp
                .cmp(&b.record.timestamp)
                .then(a.id.cmp(&b.id))
        });
        Ok(records)
    }
}

impl RecordStore for InMemoryRecordStore {
    fn insert(&self, record: &EnrichedRecord) -> Result<u64, StorageError> {
        let mut next_id = self.next_id.write().map_err(|_| StorageError::Poisoned)?;
        let mut records = self.records.write().map_err(|_| StorageError::Poisoned)?;
        *next_id += 1;
        records.push_back(StoredRecord {
            id: *next_id,
            record: record.clone(),
        });
        if let Some(max) = self.max_records {
            while records.len() > max {
                if let Some(evicted) = records.pop_front() {
                    debug!(id = evicted.id, "Evicted oldest in-memory record");
                }
            }
        }
        Ok(*next_id)
    }

    fn latest(&self, limit: usize) -> Result<Vec<StoredRecord>, StorageError> {
        Ok(self.sorted()?.into_iter().rev().take(limit).collect())
    }

    fn range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<StoredRecord>, StorageError> {
        Ok(self
            .sorted()?
            .into_iter()
            .filter(|r| r.record.timestamp >= start && r.record.timestamp <= end)
            .collect())
    }

    fn risk_statistics(&self) -> Result<Vec<RiskStatistic>, StorageError> {
        Ok(tally_statuses(self.read()?.iter().map(|r| r.record.status)))
    }

    fn info(&self) -> Result<StoreInfo, StorageError> {
        let records = self.read()?;
        Ok(StoreInfo {
            backend: self.backend_name(),
            total_records: records.len(),
            first_timestamp: records.iter().map(|r| r.record.timestamp).min(),
            last_timestamp: records.iter().map(|r| r.record.timestamp).max(),
            size_bytes: 0,
        })
    }

    fn delete_older_than(&self, cutoff: NaiveDateTime) -> Result<usize, StorageError> {
        let mut records = self.records.write().map_err(|_| StorageError::Poisoned)?;
        let before = records.len();
        records.retain(|r| r.record.timestamp >= cutoff);
        Ok(before - records.len())
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}
