//! Durable record store on sled
//!
//! Two trees:
//! - `records`: big-endian row id -> JSON record
//! - `by_time`: sortable timestamp ++ row id -> empty (chronological index)

use chrono::NaiveDateTime;
use std::path::Path;
use tracing::{debug, info, warn};

use super::{tally_statuses, RecordStore, RiskStatistic, StorageError, StoreInfo, StoredRecord};
use crate::types::EnrichedRecord;

const RECORDS_TREE: &str = "records";
const TIME_INDEX_TREE: &str = "by_time";

#[derive(Clone)]
pub struct SledRecordStore {
    db: sled::Db,
    records: sled::Tree,
    by_time: sled::Tree,
}

impl SledRecordStore {
    /// Open or create the record database at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, StorageError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let store = Self::from_db(sled::open(path)?)?;
        info!(path = %path.display(), records = store.records.len(), "Record store opened");
        Ok(store)
    }

    /// Temporary database removed on drop (tests, dry runs).
    pub fn open_temp() -> Result<Self, StorageError> {
        Self::from_db(sled::Config::new().temporary(true).open()?)
    }

    fn from_db(db: sled::Db) -> Result<Self, StorageError> {
        let records = db.open_tree(RECORDS_TREE)?;
        let by_time = db.open_tree(TIME_INDEX_TREE)?;
        Ok(Self {
            db,
            records,
            by_time,
        })
    }

    pub fn flush(&self) -> Result<(), StorageError> {
        self.db.flush()?;
        Ok(())
    }

    fn load(&self, id: u64) -> Result<Option<StoredRecord>, StorageError> {
        let Some(bytes) = self.records.get(id.to_be_bytes())? else {
            return Ok(None);
        };
        match serde_json::from_slice::<EnrichedRecord>(&bytes) {
            Ok(record) => Ok(Some(StoredRecord { id, record })),
            Err(e) => {
                warn!(id, error = %e, "Skipping undecodable record");
                Ok(None)
            }
        }
    }

    fn load_from_index(
        &self,
        entry: sled::Result<(sled::IVec, sled::IVec)>,
    ) -> Result<Option<StoredRecord>, StorageError> {
        let (key, _) = entry?;
        match decode_index_key(&key) {
            Some((_, id)) => self.load(id),
            None => Ok(None),
        }
    }
}

// ============================================================================
// Index keys
// ============================================================================

/// Order-preserving encoding of a timestamp (seconds, sign bit flipped).
fn time_prefix(ts: &NaiveDateTime) -> [u8; 8] {
    let secs = ts.and_utc().timestamp();
    ((secs as u64) ^ (1 << 63)).to_be_bytes()
}

fn index_key(ts: &NaiveDateTime, id: u64) -> [u8; 16] {
    let mut key = [0u8; 16];
    key[..8].copy_from_slice(&time_prefix(ts));
    key[8..].copy_from_slice(&id.to_be_bytes());
    key
}

fn decode_index_key(key: &[u8]) -> Option<(NaiveDateTime, u64)> {
    let secs_bytes: [u8; 8] = key.get(..8)?.try_into().ok()?;
    let id_bytes: [u8; 8] = key.get(8..16)?.try_into().ok()?;
    let secs = (u64::from_be_bytes(secs_bytes) ^ (1 << 63)) as i64;
    let ts = chrono::DateTime::from_timestamp(secs, 0)?.naive_utc();
    Some((ts, u64::from_be_bytes(id_bytes)))
}

impl RecordStore for SledRecordStore {
    fn insert(&self, record: &EnrichedRecord) -> Result<u64, StorageError> {
        // ids start at 1 so they read like database row ids
        let id = self.db.generate_id()? + 1;
        let value = serde_json::to_vec(record)?;
        self.records.insert(id.to_be_bytes(), value)?;
        self.by_time.insert(index_key(&record.timestamp, id), Vec::<u8>::new())?;
        debug!(id, status = %record.status, "Stored record");
        Ok(id)
    }

    fn latest(&self, limit: usize) -> Result<Vec<StoredRecord>, StorageError> {
        let mut out = Vec::with_capacity(limit.min(1024));
        for entry in self.by_time.iter().rev() {
            if out.len() >= limit {
                break;
            }
            if let Some(record) = self.load_from_index(entry)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn range(
        &self,
        start: NaiveDateTime,
        end: NaiveDateTime,
    ) -> Result<Vec<StoredRecord>, StorageError> {
        if end < start {
            return Ok(Vec::new());
        }
        let lo = index_key(&start, 0);
        let hi = index_key(&end, u64::MAX);
        let mut out = Vec::new();
        for entry in self.by_time.range(lo..=hi) {
            if let Some(record) = self.load_from_index(entry)? {
                out.push(record);
            }
        }
        Ok(out)
    }

    fn risk_statistics(&self) -> Result<Vec<RiskStatistic>, StorageError> {
        let mut statuses = Vec::with_capacity(self.records.len());
        for entry in self.records.iter() {
            let (_, value) = entry?;
            if let Ok(record) = serde_json::from_slice::<EnrichedRecord>(&value) {
                statuses.push(record.status);
            }
        }
        Ok(tally_statuses(statuses))
    }

    fn info(&self) -> Result<StoreInfo, StorageError> {
        let first = self
            .by_time
            .first()?
            .and_then(|(k, _)| decode_index_key(&k))
            .map(|(ts, _)| ts);
        let last = self
            .by_time
            .last()?
            .and_then(|(k, _)| decode_index_key(&k))
            .map(|(ts, _)| ts);
        Ok(StoreInfo {
            backend: self.backend_name(),
            total_records: self.records.len(),
            first_timestamp: first,
            last_timestamp: last,
            size_bytes: self.db.size_on_disk()?,
        })
    }

    fn delete_older_than(&self, cutoff: NaiveDateTime) -> Result<usize, StorageError> {
        let hi = index_key(&cutoff, 0);
        let mut index_batch = sled::Batch::default();
        let mut record_batch = sled::Batch::default();
        let mut deleted = 0;

        for entry in self.by_time.range(..hi) {
            let (key, _) = entry?;
            if let Some((_, id)) = decode_index_key(&key) {
                record_batch.remove(id.to_be_bytes().to_vec());
            }
            index_batch.remove(key);
            deleted += 1;
        }

        if deleted > 0 {
            self.records.apply_batch(record_batch)?;
            self.by_time.apply_batch(index_batch)?;
            self.db.flush()?;
            info!(deleted, cutoff = %crate::types::format_timestamp(&cutoff), "Pruned old records");
        }
        Ok(deleted)
    }

    fn backend_name(&self) -> &'static str {
        "sled"
    }
}
