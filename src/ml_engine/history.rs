//! Rolling History Store
//!
//! Ordered, bounded window of recent readings for one deployment. Owned by
//! the ingestion loop; entries are never mutated after they are appended.

use std::collections::VecDeque;

use crate::types::RawReading;

/// Result of offering a reading to the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppendOutcome {
    Appended,
    /// Timestamp earlier than the newest entry; the window is unchanged
    RejectedOutOfOrder,
}

#[derive(Debug, Clone)]
pub struct HistoryWindow {
    entries: VecDeque<RawReading>,
    retention: usize,
}

impl HistoryWindow {
    /// `retention` is clamped to at least one sample.
    pub fn new(retention: usize) -> Self {
        let retention = retention.max(1);
        Self {
            entries: VecDeque::new(),
            retention,
        }
    }

    /// Append a reading, evicting the oldest entries beyond retention.
    ///
    /// Equal timestamps are accepted. A reading strictly older than the
    /// newest entry is rejected so the window stays in non-decreasing order.
    pub fn append(&mut self, reading: RawReading) -> AppendOutcome {
        if let Some(last) = self.entries.back() {
            if reading.timestamp < last.timestamp {
                return AppendOutcome::RejectedOutOfOrder;
            }
        }
        self.entries.push_back(reading);
        while self.entries.len() > self.retention {
            self.entries.pop_front();
        }
        // Keep the ring buffer in one piece so `snapshot` is a plain slice.
        self.entries.make_contiguous();
        AppendOutcome::Appended
    }

    /// Read-only, most-recent-last view.
    pub fn snapshot(&self) -> &[RawReading] {
        let (front, back) = self.entries.as_slices();
        debug_assert!(back.is_empty());
        front
    }

    pub fn latest(&self) -> Option<&RawReading> {
        self.entries.back()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub const fn retention(&self) -> usize {
        self.retention
    }
}
